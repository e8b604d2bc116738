//! Party, visibility and input-encryption policy enums (§3, §6).

use serde::{Deserialize, Serialize};

/// The two mutually-distrusting parties in any measurement game.
///
/// `Publisher` owns touchpoint data, `Partner` owns conversion data (§3 GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    /// Party 1: owns ad touchpoints.
    Publisher,
    /// Party 2: owns conversion events.
    Partner,
}

impl Party {
    /// The CLI/wire numeric encoding of §6 (`party ∈ {1,2}`).
    pub fn as_id(self) -> u8 {
        match self {
            Party::Publisher => 1,
            Party::Partner => 2,
        }
    }

    /// Parses the CLI/wire numeric encoding of §6.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Party::Publisher),
            2 => Some(Party::Partner),
            _ => None,
        }
    }

    /// The other party.
    pub fn other(self) -> Party {
        match self {
            Party::Publisher => Party::Partner,
            Party::Partner => Party::Publisher,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Publisher => write!(f, "publisher"),
            Party::Partner => write!(f, "partner"),
        }
    }
}

/// Reveal visibility policy (§4.G, §6 `visibility`).
///
/// Governs which party (if any) learns the plaintext of a given leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Both parties learn the plaintext.
    #[default]
    Public,
    /// Only the publisher learns the plaintext; the partner's copy is zeroed.
    Publisher,
    /// Only the partner learns the plaintext; the publisher's copy is zeroed.
    Partner,
    /// Neither party learns the plaintext; both copies are zeroed.
    None,
}

impl Visibility {
    /// The CLI numeric encoding of §6 (`visibility ∈ {0,1,2}`); `none` has no CLI encoding for
    /// the shard combiner but is kept here because reveal-to-party code paths use it uniformly.
    pub fn from_cli_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Visibility::Public),
            1 => Some(Visibility::Publisher),
            2 => Some(Visibility::Partner),
            _ => None,
        }
    }

    /// Returns whether `party` is allowed to see the plaintext under this policy.
    pub fn party_may_see(self, party: Party) -> bool {
        match self {
            Visibility::Public => true,
            Visibility::Publisher => party == Party::Publisher,
            Visibility::Partner => party == Party::Partner,
            Visibility::None => false,
        }
    }
}

/// Input-encryption mode (§3).
///
/// Controls whether a party's sensitive CSV columns arrive in the clear or as pre-extracted XOR
/// shares produced by an upstream data-processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputEncryption {
    /// Both CSVs are in the clear on their owner.
    #[default]
    Plaintext,
    /// The partner's sensitive fields arrive as shares already; ordering is untouched.
    PartnerXor,
    /// Both parties' sensitive fields arrive as XOR shares; the engine must not re-sort.
    Xor,
}

impl InputEncryption {
    /// Whether rows must be treated as already correctly ordered (i.e. re-sorting by timestamp
    /// would break the upstream XOR-share layout).
    pub fn forbids_resort(self) -> bool {
        matches!(self, InputEncryption::Xor)
    }

    /// The CLI numeric encoding of §6 (`input_encryption ∈ {0,1,2}`).
    pub fn from_cli_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(InputEncryption::Plaintext),
            1 => Some(InputEncryption::PartnerXor),
            2 => Some(InputEncryption::Xor),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_round_trips_through_id() {
        for party in [Party::Publisher, Party::Partner] {
            assert_eq!(Party::from_id(party.as_id()), Some(party));
        }
        assert_eq!(Party::from_id(0), None);
        assert_eq!(Party::from_id(3), None);
    }

    #[test]
    fn visibility_gates_by_party() {
        assert!(Visibility::Public.party_may_see(Party::Publisher));
        assert!(Visibility::Public.party_may_see(Party::Partner));
        assert!(Visibility::Publisher.party_may_see(Party::Publisher));
        assert!(!Visibility::Publisher.party_may_see(Party::Partner));
        assert!(!Visibility::None.party_may_see(Party::Publisher));
        assert!(!Visibility::None.party_may_see(Party::Partner));
    }

    #[test]
    fn xor_input_forbids_resort() {
        assert!(InputEncryption::Xor.forbids_resort());
        assert!(!InputEncryption::Plaintext.forbids_resort());
        assert!(!InputEncryption::PartnerXor.forbids_resort());
    }
}
