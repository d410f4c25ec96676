pub type FileId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Span({}:{}-{})", self.file, self.lo, self.hi)
    }
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32) -> Span {
        Span { file, lo, hi }
    }

    /// The span used when a type has no source location (builtins, synthesized types).
    pub const fn null() -> Span {
        Span {
            file: 0,
            lo: 0,
            hi: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.file == 0 && self.lo == 0 && self.hi == 0
    }
}
