/// Suffix of the temporary file a blob is written to before being renamed into place.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Length of the random hex component of a blob key.
pub(crate) const RANDOM_HEX_LEN: usize = 32;
