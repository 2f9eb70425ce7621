/// Join raw text fragments into a transcript: trim each fragment, drop the
/// empty ones, join the rest with a single space. Order is preserved and
/// nothing is deduplicated; timing information is discarded here.
pub fn assemble<S: AsRef<str>>(fragments: &[S]) -> String {
    let mut out = String::new();
    for frag in fragments {
        let trimmed = frag.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(trimmed);
    }
    out
}
