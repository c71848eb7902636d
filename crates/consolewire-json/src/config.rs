/// How the JSON region is located inside a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// First opening delimiter through the last closing delimiter of the
    /// same shape; the earlier of `{` and `[` wins when both qualify.
    #[default]
    Heuristic,
    /// First opening delimiter that closes at nesting depth zero, honouring
    /// string literals and backslash escapes.
    Balanced,
}
