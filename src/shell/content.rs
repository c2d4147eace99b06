//! Welcome / main content selection

use std::path::Path;

/// Top-level view shown in the main window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentView {
    Welcome,
    Main,
}

/// Tracks which view is shown; Welcome can only move to Main
#[derive(Debug, Clone)]
pub struct ContentHost {
    view: ContentView,
}

impl ContentHost {
    /// Pick the first view from the configured user data folder
    pub fn initial(user_data_folder: Option<&Path>) -> Self {
        let view = match user_data_folder {
            Some(_) => ContentView::Main,
            None => ContentView::Welcome,
        };
        Self { view }
    }

    pub fn view(&self) -> ContentView {
        self.view
    }

    /// The main view has been loaded at least once
    pub fn main_loaded(&self) -> bool {
        self.view == ContentView::Main
    }

    /// Leave the welcome page; returns false when the main view was already shown
    pub fn finish_welcome(&mut self) -> bool {
        if self.view == ContentView::Main {
            return false;
        }
        self.view = ContentView::Main;
        true
    }
}
