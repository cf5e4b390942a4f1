//! Console action handlers.
//!
//! Wires the durable state file, the session context and the portal gateway
//! together, then runs one subcommand against them. This is the stand-in for
//! the consoles' entry points; everything it does goes through the core, so
//! no action ever inspects a raw token or permission string itself.

use crate::authz::MenuNode;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::portal::{Credentials, PortalGateway};
use crate::session::{LifecycleState, SessionContext, SessionManager};
use crate::store::storage::FileStorage;
use crate::store::CredentialStore;
use anyhow::{anyhow, bail, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Handle the resolved action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let storage = Arc::new(FileStorage::new(&globals.state_file));
    let ctx = Arc::new(SessionContext::new(
        CredentialStore::new(storage),
        Arc::new(|| println!("Session ended, please sign in again.")),
    ));
    ctx.hydrate()?;

    let gateway = Arc::new(PortalGateway::new(globals.api_url.clone())?);
    let manager = SessionManager::new(ctx.clone(), gateway);

    match action {
        Action::Login { email, password } => {
            // A fresh login replaces whatever session the state file held.
            if ctx.state() == LifecycleState::Authenticated {
                manager.logout();
            }
            manager.login(&Credentials::new(email, password)).await?;

            match ctx.store().profile() {
                Some(profile) => {
                    println!("Signed in as {} <{}>", profile.display_name, profile.email);
                }
                None => println!("Signed in"),
            }
            println!(
                "{} permission codes granted",
                ctx.permissions().codes().len()
            );
        }
        Action::Logout => {
            manager.logout();
            println!("Signed out");
        }
        Action::Whoami => {
            require_session(&manager)?;
            let profile = ctx
                .store()
                .profile()
                .ok_or_else(|| anyhow!("no stored profile, sign in again"))?;
            manager.refresh_permissions().await?;

            println!(
                "{} <{}> (principal {})",
                profile.display_name, profile.email, profile.id
            );
            for code in ctx.permissions().codes() {
                println!("  {code}");
            }
        }
        Action::Menu { file } => {
            require_session(&manager)?;
            manager.refresh_permissions().await?;

            let tree = match file {
                Some(path) => load_menu(&path)?,
                None => console_menu(),
            };
            let filtered = ctx.permissions().filter_menu(&tree);
            if filtered.is_empty() {
                println!("No navigation entries granted");
            } else {
                print_menu(&filtered, 0);
            }
        }
    }

    Ok(())
}

fn require_session(manager: &SessionManager) -> Result<()> {
    if manager.expire_if_stale() {
        bail!("session expired, run `ingresso login`");
    }
    if !manager.context().store().is_authenticated() {
        bail!("no active session, run `ingresso login`");
    }
    Ok(())
}

fn load_menu(path: &Path) -> Result<Vec<MenuNode>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Built-in console navigation, gated by the codes the backend grants.
fn console_menu() -> Vec<MenuNode> {
    vec![
        MenuNode::open("dashboard", "/dashboard"),
        MenuNode::guarded("candidates", "/candidates", "candidate:list"),
        MenuNode::guarded("jobs", "/jobs", "job:list"),
        MenuNode::guarded("placements", "/placements", "placement:list"),
        MenuNode::guarded("courses", "/courses", "course:list"),
        MenuNode::guarded("reports", "/reports", "report:view"),
        MenuNode::guarded("admin", "/admin", "admin:view").with_children(vec![
            MenuNode::guarded("users", "/admin/users", "admin:user:list"),
            MenuNode::guarded("roles", "/admin/roles", "admin:role:list"),
        ]),
    ]
}

fn print_menu(nodes: &[MenuNode], depth: usize) {
    for node in nodes {
        println!("{:indent$}{} ({})", "", node.id, node.path, indent = depth * 2);
        print_menu(&node.children, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_menu_is_fully_guarded_beyond_the_dashboard() {
        let tree = console_menu();
        assert_eq!(tree[0].required_permission, None);
        for node in &tree[1..] {
            assert!(node.required_permission.is_some(), "{} unguarded", node.id);
        }
    }

    #[test]
    fn load_menu_parses_a_definition_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("navigation.json");
        fs::write(
            &path,
            r#"[{"id": "dashboard", "path": "/dashboard"},
                {"id": "candidates", "path": "/candidates",
                 "required_permission": "candidate:list"}]"#,
        )?;

        let tree = load_menu(&path)?;
        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree[1].required_permission,
            Some("candidate:list".to_string())
        );
        Ok(())
    }
}
