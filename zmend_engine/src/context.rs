//! Observable game context.
//!
//! Everything here is literally printed text the host has seen: the current
//! room header, object names on the ground, inventory listings, exits.
//! Nothing is inferred from game state, and population is optional; an
//! all-empty context is valid and is the default.

use std::collections::HashSet;
use std::collections::VecDeque;

pub const DEFAULT_RECENT_COMMAND_LIMIT: usize = 10;

/// Observed surroundings for the active session.
#[derive(Debug, Clone)]
pub struct GameContext {
    pub current_room: Option<String>,
    pub visible_objects: HashSet<String>,
    pub inventory: HashSet<String>,
    pub exits: HashSet<String>,
    recent_commands: VecDeque<String>,
    recent_limit: usize,
}

impl Default for GameContext {
    fn default() -> Self {
        Self::with_limit(DEFAULT_RECENT_COMMAND_LIMIT)
    }
}

impl GameContext {
    pub fn with_limit(recent_limit: usize) -> Self {
        Self {
            current_room: None,
            visible_objects: HashSet::new(),
            inventory: HashSet::new(),
            exits: HashSet::new(),
            recent_commands: VecDeque::new(),
            recent_limit: recent_limit.max(1),
        }
    }

    /// Record a command the player actually sent, oldest dropped first.
    pub fn note_command(&mut self, command: &str) {
        if self.recent_commands.len() == self.recent_limit {
            self.recent_commands.pop_front();
        }
        self.recent_commands.push_back(command.to_string());
    }

    pub fn recent_commands(&self) -> impl Iterator<Item = &str> {
        self.recent_commands.iter().map(String::as_str)
    }

    /// Record an object name printed by the game.
    pub fn observe_object(&mut self, name: &str) {
        self.visible_objects.insert(name.trim().to_lowercase());
    }

    /// Record an item from a printed inventory listing.
    pub fn observe_inventory(&mut self, name: &str) {
        self.inventory.insert(name.trim().to_lowercase());
    }

    /// Record an exit direction printed by the game.
    pub fn observe_exit(&mut self, direction: &str) {
        self.exits.insert(direction.trim().to_lowercase());
    }

    /// True if `word` names something the player can see or is carrying.
    pub fn knows_object(&self, word: &str) -> bool {
        self.visible_objects.contains(word) || self.inventory.contains(word)
    }
}
