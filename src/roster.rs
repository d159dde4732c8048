//! Room membership and score tracking.
//!
//! The [`Roster`] is the client's single source of truth for who is in the
//! room and what they have scored. Entries are keyed by server-assigned
//! connection id. Players listed by the room service before the socket
//! opens have no id yet; they are held under their username as
//! *provisional* entries and upgraded in place when a `playerJoined`
//! broadcast supplies the real id.
//!
//! Mutations report whether anything changed so the caller can decide
//! when to re-project the roster for the UI.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One player in the room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    /// Server-assigned connection id, or the username itself for entries
    /// seeded from the room service before the id is known.
    pub id: String,
    /// Display name, unique per room.
    pub name: String,
    pub score: u32,
}

/// Point-in-time projection of the roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RosterSnapshot {
    /// Players in arrival order, for membership display.
    pub players: Vec<Player>,
    /// Players sorted by score descending, ties broken by ascending name.
    pub leaderboard: Vec<Player>,
}

/// The set of players currently in the room.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: HashMap<String, Player>,
    /// Keys of `players` in arrival order.
    order: Vec<String>,
    /// Keys that are usernames standing in for a not-yet-known id.
    provisional: HashSet<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player known only by username, before the server has
    /// assigned a connection id. Duplicate names are ignored.
    pub fn seed_player(&mut self, name: &str, score: u32) {
        if self.players.contains_key(name) {
            return;
        }
        self.provisional.insert(name.to_owned());
        self.order.push(name.to_owned());
        self.players.insert(
            name.to_owned(),
            Player {
                id: name.to_owned(),
                name: name.to_owned(),
                score,
            },
        );
    }

    /// Adds a player with a fresh score of zero.
    ///
    /// Idempotent: if the id is already present nothing changes. If a
    /// provisional entry exists under the same username, it is upgraded
    /// to the real id in place, keeping its score and arrival position.
    /// Returns whether the roster changed.
    pub fn add_player(&mut self, id: &str, name: &str) -> bool {
        if self.players.contains_key(id) {
            debug!(id, name, "ignoring duplicate player join");
            return false;
        }

        if let Some(key) = self.provisional_key(name) {
            if let Some(previous) = self.players.remove(&key) {
                self.provisional.remove(&key);
                if let Some(slot) = self.order.iter_mut().find(|k| **k == key) {
                    *slot = id.to_owned();
                }
                self.players.insert(
                    id.to_owned(),
                    Player {
                        id: id.to_owned(),
                        name: name.to_owned(),
                        score: previous.score,
                    },
                );
                return true;
            }
        }

        self.order.push(id.to_owned());
        self.players.insert(
            id.to_owned(),
            Player {
                id: id.to_owned(),
                name: name.to_owned(),
                score: 0,
            },
        );
        true
    }

    /// Removes a player, but only when both id and name match an existing
    /// entry. A mismatched or unknown pair leaves the roster untouched.
    /// Returns whether the roster changed.
    pub fn remove_player(&mut self, id: &str, name: &str) -> bool {
        let key = match self.players.get(id) {
            Some(entry) if entry.name == name => id.to_owned(),
            Some(entry) => {
                debug!(id, name, known = %entry.name, "ignoring player removal with mismatched name");
                return false;
            }
            None => match self.provisional_key(name) {
                Some(key) => key,
                None => {
                    debug!(id, name, "ignoring removal of unknown player");
                    return false;
                }
            },
        };
        self.players.remove(&key);
        self.order.retain(|k| k != &key);
        self.provisional.remove(&key);
        true
    }

    /// Sets a player's score. An unknown id is ignored so that a stray
    /// score event can never invent a roster entry. Returns whether the
    /// score was applied.
    pub fn update_score(&mut self, id: &str, score: u32) -> bool {
        match self.players.get_mut(id) {
            Some(entry) => {
                entry.score = score;
                true
            }
            None => {
                debug!(id, score, "ignoring score update for unknown player");
                false
            }
        }
    }

    /// Current score for a player, if present.
    pub fn score_of(&self, id: &str) -> Option<u32> {
        self.players.get(id).map(|p| p.score)
    }

    /// Looks up a player's key by display name, in arrival order.
    pub fn id_by_name(&self, name: &str) -> Option<&str> {
        self.order.iter().find_map(|key| {
            self.players
                .get(key)
                .filter(|p| p.name == name)
                .map(|p| p.id.as_str())
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    /// Number of players in the room.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Projects the roster into its two display orderings.
    pub fn snapshot(&self) -> RosterSnapshot {
        let players: Vec<Player> = self
            .order
            .iter()
            .filter_map(|key| self.players.get(key))
            .cloned()
            .collect();
        let mut leaderboard = players.clone();
        leaderboard.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        RosterSnapshot {
            players,
            leaderboard,
        }
    }

    fn provisional_key(&self, name: &str) -> Option<String> {
        self.provisional.contains(name).then(|| name.to_owned())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn names(players: &[Player]) -> Vec<&str> {
        players.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn add_player_starts_at_zero() {
        let mut roster = Roster::new();
        assert!(roster.add_player("p1", "alice"));
        assert_eq!(roster.score_of("p1"), Some(0));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn duplicate_add_keeps_one_entry() {
        let mut roster = Roster::new();
        assert!(roster.add_player("p1", "alice"));
        assert!(!roster.add_player("p1", "alice"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn remove_requires_matching_name() {
        let mut roster = Roster::new();
        roster.add_player("p1", "alice");
        assert!(!roster.remove_player("p1", "bob"));
        assert_eq!(roster.len(), 1);
        assert!(roster.remove_player("p1", "alice"));
        assert!(roster.is_empty());
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut roster = Roster::new();
        roster.add_player("p1", "alice");
        assert!(!roster.remove_player("p2", "bob"));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn score_update_for_unknown_id_creates_nothing() {
        let mut roster = Roster::new();
        assert!(!roster.update_score("ghost", 5));
        assert!(roster.is_empty());
    }

    #[test]
    fn leaderboard_orders_by_score_then_name() {
        let mut roster = Roster::new();
        roster.add_player("p1", "b");
        roster.add_player("p2", "a");
        roster.add_player("p3", "c");
        roster.update_score("p1", 5);
        roster.update_score("p2", 5);
        roster.update_score("p3", 9);

        let snapshot = roster.snapshot();
        assert_eq!(names(&snapshot.leaderboard), vec!["c", "a", "b"]);
        // Membership view keeps arrival order.
        assert_eq!(names(&snapshot.players), vec!["b", "a", "c"]);
    }

    #[test]
    fn seeded_entry_upgrades_to_real_id() {
        let mut roster = Roster::new();
        roster.seed_player("alice", 3);
        roster.add_player("p9", "bob");
        assert!(roster.add_player("p1", "alice"));

        assert_eq!(roster.len(), 2);
        let snapshot = roster.snapshot();
        assert_eq!(names(&snapshot.players), vec!["alice", "bob"]);
        assert_eq!(roster.score_of("p1"), Some(3));
        assert!(!roster.contains("alice"));
    }

    #[test]
    fn seeded_entry_can_be_removed_by_name() {
        let mut roster = Roster::new();
        roster.seed_player("alice", 0);
        assert!(roster.remove_player("p1", "alice"));
        assert!(roster.is_empty());
    }

    #[test]
    fn id_by_name_follows_arrival_order() {
        let mut roster = Roster::new();
        roster.seed_player("alice", 0);
        roster.add_player("p2", "bob");
        assert_eq!(roster.id_by_name("bob"), Some("p2"));
        assert_eq!(roster.id_by_name("alice"), Some("alice"));
        assert_eq!(roster.id_by_name("carol"), None);
    }
}
