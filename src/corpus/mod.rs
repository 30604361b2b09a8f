pub mod assembler;
pub mod classifier;
pub mod walker;

pub use assembler::{compact, AssembleOptions, CorpusAssembler, RunHeader};
pub use classifier::{classify, decode_text, ContentKind};
pub use walker::{CorpusItem, RepoCorpus, RepoWalker, WalkOutcome};
