use crate::Error;
use std::fmt;
use std::str::FromStr;

/// How candidate image pairs are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingMode {
    /// Every image with the next images of the sequence.
    Sequential,
    /// Every image with its most similar images by global descriptor.
    Retrieval,
    /// Sequential pairs plus periodic retrieval queries that close loops.
    SequentialRetrieval,
}

impl PairingMode {
    pub const ALL: [PairingMode; 3] = [
        PairingMode::Sequential,
        PairingMode::Retrieval,
        PairingMode::SequentialRetrieval,
    ];

    /// Whether global descriptors must be extracted.
    pub fn uses_retrieval(self) -> bool {
        matches!(
            self,
            PairingMode::Retrieval | PairingMode::SequentialRetrieval
        )
    }

    /// The name of the pair list written for this mode.
    pub fn pairs_file_name(self, window_size: usize, num_loc: usize) -> String {
        match self {
            PairingMode::Sequential => format!("pairs-sequential{}.txt", window_size),
            PairingMode::Retrieval => format!("pairs-retrieval-netvlad{}.txt", num_loc),
            PairingMode::SequentialRetrieval => format!(
                "pairs-sequential{}-retrieval-netvlad{}.txt",
                window_size, num_loc
            ),
        }
    }
}

impl FromStr for PairingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(PairingMode::Sequential),
            "retrieval" => Ok(PairingMode::Retrieval),
            "sequential+retrieval" => Ok(PairingMode::SequentialRetrieval),
            _ => Err(Error::UnknownPairing(s.to_owned())),
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PairingMode::Sequential => "sequential",
            PairingMode::Retrieval => "retrieval",
            PairingMode::SequentialRetrieval => "sequential+retrieval",
        })
    }
}
