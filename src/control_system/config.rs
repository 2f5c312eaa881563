use std::error::Error;
use std::fmt;

/// Maps a weighted traffic density to a green-phase duration.
///
/// Evaluated in order, first match wins: `< edges[0]`, then `[edges[0],
/// edges[1])`, `[edges[1], edges[2])`, `[edges[2], edges[3]]` (upper edge
/// inclusive), and `> edges[3]`. A density sitting exactly on an edge
/// selects the upper bucket, except the final edge which still belongs to
/// its bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketTable {
    pub edges: [f64; 4],
    pub durations: [f64; 5],
}

impl BucketTable {
    pub fn new(edges: [f64; 4], durations: [f64; 5]) -> Self {
        Self { edges, durations }
    }

    pub fn duration_for(&self, density: f64) -> f64 {
        if density < self.edges[0] {
            self.durations[0]
        } else if density < self.edges[1] {
            self.durations[1]
        } else if density < self.edges[2] {
            self.durations[2]
        } else if density <= self.edges[3] {
            self.durations[3]
        } else {
            self.durations[4]
        }
    }

    /// Default table for phases whose shortest green is 20 seconds.
    pub fn long_floor() -> Self {
        Self::new([5.0, 10.0, 15.0, 20.0], [20.0, 30.0, 45.0, 60.0, 75.0])
    }

    /// Default table for phases whose shortest green is 15 seconds.
    pub fn short_floor() -> Self {
        Self::new([5.0, 10.0, 15.0, 20.0], [15.0, 30.0, 45.0, 60.0, 75.0])
    }
}

/// Errors raised while validating a [`SignalConfig`]. All of these are
/// fatal to controller creation.
#[derive(Debug)]
pub enum ConfigError {
    /// The phase list is empty.
    NoPhases,
    /// A phase's green vector does not cover every approach group.
    GreenVectorLength {
        phase: usize,
        expected: usize,
        found: usize,
    },
    /// A phase grants right-of-way to no group at all.
    EmptyPhase(usize),
    /// The number of initial durations does not match the number of phases.
    DurationCount { expected: usize, found: usize },
    /// An initial duration is zero or negative.
    NonPositiveDuration { phase: usize, value: f64 },
    /// The number of bucket tables does not match the number of phases.
    BucketTableCount { expected: usize, found: usize },
    /// A bucket table's edges are not strictly ascending.
    UnorderedBucketEdges(usize),
    /// A bucket table maps some density to a zero or negative duration.
    NonPositiveBucketDuration(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoPhases => write!(f, "phase list is empty"),
            ConfigError::GreenVectorLength {
                phase,
                expected,
                found,
            } => write!(
                f,
                "phase {} green vector covers {} groups, expected {}",
                phase, found, expected
            ),
            ConfigError::EmptyPhase(phase) => {
                write!(f, "phase {} grants right-of-way to no group", phase)
            }
            ConfigError::DurationCount { expected, found } => write!(
                f,
                "{} initial durations given for {} phases",
                found, expected
            ),
            ConfigError::NonPositiveDuration { phase, value } => write!(
                f,
                "initial duration for phase {} must be positive, got {}",
                phase, value
            ),
            ConfigError::BucketTableCount { expected, found } => {
                write!(f, "{} bucket tables given for {} phases", found, expected)
            }
            ConfigError::UnorderedBucketEdges(phase) => write!(
                f,
                "bucket table for phase {} has non-ascending edges",
                phase
            ),
            ConfigError::NonPositiveBucketDuration(phase) => write!(
                f,
                "bucket table for phase {} contains a non-positive duration",
                phase
            ),
        }
    }
}

impl Error for ConfigError {}

/// Controller configuration: explicit, typed, and validated up front.
/// Every field has a default matching the standard two-phase, four-group
/// intersection.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Per phase, which approach groups have right-of-way. All vectors must
    /// be the same length; that length is the number of approach groups.
    pub phases: Vec<Vec<bool>>,
    /// Starting target duration per phase, in simulation seconds.
    pub initial_durations: Vec<f64>,
    /// When false the controller never leaves fixed mode and simply cycles
    /// the initial durations.
    pub adaptive_enabled: bool,
    /// Density-to-duration table per phase.
    pub bucket_tables: Vec<BucketTable>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            phases: vec![
                vec![true, false, true, false],
                vec![false, true, false, true],
            ],
            initial_durations: vec![30.0, 30.0],
            adaptive_enabled: true,
            bucket_tables: vec![BucketTable::short_floor(), BucketTable::long_floor()],
        }
    }
}

impl SignalConfig {
    /// Number of approach groups this configuration covers.
    pub fn group_count(&self) -> usize {
        self.phases.first().map(|p| p.len()).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::NoPhases);
        }
        let groups = self.phases[0].len();
        for (i, phase) in self.phases.iter().enumerate() {
            if phase.len() != groups {
                return Err(ConfigError::GreenVectorLength {
                    phase: i,
                    expected: groups,
                    found: phase.len(),
                });
            }
            if !phase.iter().any(|&g| g) {
                return Err(ConfigError::EmptyPhase(i));
            }
        }
        if self.initial_durations.len() != self.phases.len() {
            return Err(ConfigError::DurationCount {
                expected: self.phases.len(),
                found: self.initial_durations.len(),
            });
        }
        for (i, &d) in self.initial_durations.iter().enumerate() {
            if d <= 0.0 {
                return Err(ConfigError::NonPositiveDuration { phase: i, value: d });
            }
        }
        if self.bucket_tables.len() != self.phases.len() {
            return Err(ConfigError::BucketTableCount {
                expected: self.phases.len(),
                found: self.bucket_tables.len(),
            });
        }
        for (i, table) in self.bucket_tables.iter().enumerate() {
            if table.edges.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ConfigError::UnorderedBucketEdges(i));
            }
            if table.durations.iter().any(|&d| d <= 0.0) {
                return Err(ConfigError::NonPositiveBucketDuration(i));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SignalConfig::default().validate().is_ok());
        assert_eq!(SignalConfig::default().group_count(), 4);
    }

    #[test]
    fn empty_phase_list_is_rejected() {
        let config = SignalConfig {
            phases: Vec::new(),
            ..SignalConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoPhases)));
    }

    #[test]
    fn mismatched_green_vector_is_rejected() {
        let config = SignalConfig {
            phases: vec![vec![true, false, true, false], vec![false, true]],
            ..SignalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GreenVectorLength {
                phase: 1,
                expected: 4,
                found: 2
            })
        ));
    }

    #[test]
    fn all_red_phase_is_rejected() {
        let config = SignalConfig {
            phases: vec![vec![true, false, true, false], vec![false; 4]],
            ..SignalConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPhase(1))));
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let config = SignalConfig {
            initial_durations: vec![30.0, 0.0],
            ..SignalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveDuration { phase: 1, .. })
        ));
    }

    #[test]
    fn unordered_bucket_edges_are_rejected() {
        let mut config = SignalConfig::default();
        config.bucket_tables[0].edges = [5.0, 5.0, 15.0, 20.0];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnorderedBucketEdges(0))
        ));
    }

    #[test]
    fn bucket_edges_select_the_upper_bucket() {
        let table = BucketTable::long_floor();
        assert_eq!(table.duration_for(0.0), 20.0);
        assert_eq!(table.duration_for(4.9), 20.0);
        // A density exactly on an edge belongs to the bucket above it.
        assert_eq!(table.duration_for(5.0), 30.0);
        assert_eq!(table.duration_for(10.0), 45.0);
        assert_eq!(table.duration_for(15.0), 60.0);
        // The final edge is inclusive.
        assert_eq!(table.duration_for(20.0), 60.0);
        assert_eq!(table.duration_for(20.1), 75.0);
    }

    #[test]
    fn short_floor_differs_only_in_the_lowest_tier() {
        let short = BucketTable::short_floor();
        let long = BucketTable::long_floor();
        assert_eq!(short.duration_for(0.0), 15.0);
        for density in [5.0, 10.0, 15.0, 20.0, 25.0] {
            assert_eq!(short.duration_for(density), long.duration_for(density));
        }
    }
}
