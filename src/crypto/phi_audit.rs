// Static-analysis tests that scan every Rust source file for tracing::
// calls containing sensitive field patterns. Phone numbers, message bodies,
// notes and credential material must never reach the logs — only opaque ids.
