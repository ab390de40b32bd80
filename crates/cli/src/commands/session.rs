//! Session and route gating commands.

#![allow(clippy::print_stdout)]

use shopease_storefront::{Gated, RouteClass, Storefront};

/// Print who the store thinks we are.
pub async fn show(storefront: &Storefront) {
    match storefront.session().resolve().await {
        Some(user) if user.is_admin => println!("{} (#{}, admin)", user.username, user.id),
        Some(user) => println!("{} (#{})", user.username, user.id),
        None => println!("Not logged in"),
    }
}

/// Print what navigating to `path` would do for the resolved session.
pub async fn gate(storefront: &Storefront, path: &str) {
    let class = RouteClass::for_path(path);
    match storefront.navigate(path, || ()).await {
        Gated::Render(()) => println!("{path} ({class:?}): render"),
        Gated::Waiting => println!("{path} ({class:?}): waiting for session"),
        Gated::Redirect(target) => println!(
            "{path} ({class:?}): redirect to {}",
            target.path(&storefront.config().navigation)
        ),
    }
}
