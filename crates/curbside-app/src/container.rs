//! Side menu around the home screen.
//!
//! Picking an option collapses the menu. Signing out needs a confirmation
//! before the account flow runs.

use std::fmt;

use curbside_core::User;

/// Prompt shown before signing out.
pub const SIGN_OUT_PROMPT: &str = "Are you sure you want to log out?";

/// Entries of the side menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuOption {
    /// Trip history.
    YourTrips,
    /// Account settings.
    Settings,
    /// Sign out.
    Logout,
}

impl MenuOption {
    /// All options in display order.
    pub const ALL: [Self; 3] = [Self::YourTrips, Self::Settings, Self::Logout];
}

impl fmt::Display for MenuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::YourTrips => "Your Trips",
            Self::Settings => "Settings",
            Self::Logout => "Log Out",
        })
    }
}

/// What the frontend does after a menu interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerAction {
    /// Redraw menu and home screen.
    Render,
    /// Show trip history.
    ShowTrips,
    /// Present settings for the user.
    ShowSettings(User),
    /// Ask for confirmation with [`SIGN_OUT_PROMPT`].
    ConfirmSignOut,
    /// Run the sign-out flow.
    SignOut,
    /// Present the login screen.
    PresentLogin,
}

/// Menu state for the signed-in user.
#[derive(Debug, Clone)]
pub struct Container {
    user: User,
    expanded: bool,
}

impl Container {
    /// Collapsed menu for `user`.
    pub fn new(user: User) -> Self {
        Self { user, expanded: false }
    }

    /// Signed-in user.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Menu is open.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Open or close the menu.
    pub fn toggle_menu(&mut self) -> Vec<ContainerAction> {
        self.expanded = !self.expanded;
        vec![ContainerAction::Render]
    }

    /// Close the menu, e.g. on a tap outside it.
    pub fn dismiss_menu(&mut self) -> Vec<ContainerAction> {
        if !self.expanded {
            return vec![];
        }
        self.expanded = false;
        vec![ContainerAction::Render]
    }

    /// Handle a menu selection.
    pub fn select(&mut self, option: MenuOption) -> Vec<ContainerAction> {
        self.expanded = false;

        let follow_up = match option {
            MenuOption::YourTrips => ContainerAction::ShowTrips,
            MenuOption::Settings => ContainerAction::ShowSettings(self.user.clone()),
            MenuOption::Logout => ContainerAction::ConfirmSignOut,
        };
        vec![ContainerAction::Render, follow_up]
    }

    /// Answer to the sign-out prompt.
    pub fn confirm_sign_out(&mut self, confirmed: bool) -> Vec<ContainerAction> {
        if confirmed {
            vec![ContainerAction::SignOut, ContainerAction::PresentLogin]
        } else {
            vec![]
        }
    }
}
