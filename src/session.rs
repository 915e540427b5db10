//! Live editor session
//!
//! Holds the state of one editing pass over comparison output: the text the
//! session was opened with, the frozen base that edits are diffed against,
//! the acronyms detected in that base and the last rendered markup.
//! A session lives as long as its owner keeps it; there is no global state.

use crate::casing::{extract_acronyms, to_report_case};
use crate::render::{render_live, Markup};
use crate::settings::Settings;
use log::debug;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct EditorSession {
    source: String,
    base: String,
    acronyms: BTreeSet<String>,
    last_html: Option<String>,
}

impl EditorSession {
    /// Start a session whose base is the opened text
    pub fn open(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            acronyms: extract_acronyms(&source),
            base: source.clone(),
            source,
            last_html: None,
        }
    }

    /// Open `source` again; an already rendered session over the same
    /// source is resumed unchanged. Returns true when resumed.
    pub fn reopen(&mut self, source: &str) -> bool {
        if self.source == source && self.last_html.is_some() {
            return true;
        }
        *self = Self::open(source);
        false
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn acronyms(&self) -> &BTreeSet<String> {
        &self.acronyms
    }

    /// HTML of the most recent render, if any
    pub fn last_html(&self) -> Option<&str> {
        self.last_html.as_deref()
    }

    /// Freeze the current text as the new base
    pub fn use_as_base(&mut self, current: &str) {
        self.base = current.to_string();
        self.acronyms = extract_acronyms(current);
        self.last_html = None;
        debug!("editor base re-frozen ({} acronyms)", self.acronyms.len());
    }

    /// Discard all edits and return the text the session was opened with
    pub fn restore(&mut self) -> &str {
        self.base = self.source.clone();
        self.acronyms = extract_acronyms(&self.source);
        self.last_html = None;
        &self.source
    }

    /// Diff the current text against the base
    pub fn render(&mut self, current: &str) -> Markup {
        let markup = render_live(&self.base, current);
        self.last_html = Some(markup.to_html());
        markup
    }

    /// Apply report casing, preserving base acronyms and configured words
    pub fn normalize_case(&self, current: &str, keep_headings: bool, settings: &Settings) -> String {
        let preserved: BTreeSet<String> = self
            .acronyms
            .union(&settings.excluded_words)
            .cloned()
            .collect();
        to_report_case(current, keep_headings, &preserved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SpanKind;

    #[test]
    fn test_open_extracts_acronyms() {
        let session = EditorSession::open("Estudio TC con lesión de 12 mm.");
        assert_eq!(session.base(), session.source());
        assert!(session.acronyms().contains("TC"));
        assert!(session.acronyms().contains("12"));
        assert!(session.last_html().is_none());
    }

    #[test]
    fn test_render_against_base() {
        let mut session = EditorSession::open("Bazo normal.");
        let markup = session.render("Bazo normal. Quiste simple.");
        assert!(markup.spans().iter().any(|s| s.kind == SpanKind::NewEdit));
        assert_eq!(
            session.last_html(),
            Some("Bazo normal<mark class=\"add\">. Quiste simple</mark>.")
        );
    }

    #[test]
    fn test_use_as_base_clears_new_edits() {
        let mut session = EditorSession::open("Bazo normal.");
        let edited = "Bazo normal. Quiste simple.";
        session.use_as_base(edited);
        let markup = session.render(edited);
        assert!(markup.spans().iter().all(|s| s.kind == SpanKind::Plain));
        assert_eq!(session.source(), "Bazo normal.");
    }

    #[test]
    fn test_restore_resets_base() {
        let mut session = EditorSession::open("Hígado normal.");
        session.use_as_base("Otro texto.");
        assert_eq!(session.restore(), "Hígado normal.");
        assert_eq!(session.base(), "Hígado normal.");
    }

    #[test]
    fn test_reopen_resumes_rendered_session() {
        let mut session = EditorSession::open("Texto A.");
        assert!(!session.reopen("Texto A."));
        session.render("Texto A editado.");
        assert!(session.reopen("Texto A."));
        assert!(session.last_html().is_some());
        assert!(!session.reopen("Texto B."));
        assert_eq!(session.base(), "Texto B.");
    }

    #[test]
    fn test_normalize_case_keeps_acronyms() {
        let session = EditorSession::open("LESIÓN VBI DE 5 MM.");
        let settings = Settings::default();
        let out = session.normalize_case("LESIÓN VBI EN T2, CONTROL CON RM.", true, &settings);
        assert_eq!(out, "Lesión VBI en T2, control con RM.");
    }
}
