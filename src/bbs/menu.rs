//! Seam to the menu-navigation stack.
//!
//! The bootstrap only ever needs `goto`; menu rendering and navigation live behind
//! this trait. [`NavStack`] is the history-keeping implementation the server uses.
use anyhow::{bail, Result};
use log::info;

pub trait MenuStack: Send {
    /// Transition to the named menu.
    fn goto(&mut self, name: &str) -> Result<()>;

    /// Menu currently on top of the stack.
    fn current(&self) -> Option<&str>;
}

#[derive(Debug, Default, Clone)]
pub struct NavStack {
    session_id: String,
    history: Vec<String>,
}

impl NavStack {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
        }
    }
}

impl MenuStack for NavStack {
    fn goto(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("menu name must not be empty");
        }
        info!("session {}: menu -> {}", self.session_id, name);
        self.history.push(name.to_string());
        Ok(())
    }

    fn current(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_pushes_history() {
        let mut nav = NavStack::new("s1");
        assert_eq!(nav.current(), None);
        nav.goto("matrix").unwrap();
        nav.goto("login").unwrap();
        assert_eq!(nav.current(), Some("login"));
        assert_eq!(nav.history, vec!["matrix".to_string(), "login".to_string()]);
        assert!(nav.goto(" ").is_err());
    }
}
