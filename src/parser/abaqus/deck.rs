//! In-memory view of an Abaqus input deck.
//!
//! Each physical line is stored verbatim together with its own terminator, so a deck
//! that is parsed and written back without edits is byte-identical to its source.
//! On top of the raw text every line carries a [`LineKind`], and keyword lines are
//! parsed into a [`Keyword`] (name + parameters). Sections group a keyword line with
//! the data and comment lines that follow it.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Keywords the parser and the patcher navigate by, keyed by normalized name
static MARKERS: Lazy<HashMap<&'static str, Marker>> = Lazy::new(|| {
    HashMap::from([
        ("PART", Marker::Part),
        ("ENDPART", Marker::EndPart),
        ("ASSEMBLY", Marker::Assembly),
        ("ENDASSEMBLY", Marker::EndAssembly),
        ("INSTANCE", Marker::Instance),
        ("ENDINSTANCE", Marker::EndInstance),
        ("NODE", Marker::Node),
        ("NSET", Marker::Nset),
        ("STEP", Marker::Step),
        ("ENDSTEP", Marker::EndStep),
        ("TEMPERATURE", Marker::Temperature),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Part,
    EndPart,
    Assembly,
    EndAssembly,
    Instance,
    EndInstance,
    Node,
    Nset,
    Step,
    EndStep,
    Temperature,
}

/// Uppercase with all whitespace removed: "*End  assembly" and "*END ASSEMBLY" compare equal
pub fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_uppercase).collect()
}

/// Collapse runs of whitespace and uppercase, for comment matching
fn normalize_comment(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: String,                           // Name as written, without the leading '*'
    pub params: Vec<(String, Option<String>)>,  // "key=value" or bare "key" parameters, in order
}

impl Keyword {
    /// Parse a keyword line ("*Nset, nset=A, instance=B"); None for comments and data
    pub fn parse(line: &str) -> Option<Keyword> {
        let trimmed = line.trim();
        if !trimmed.starts_with('*') || trimmed.starts_with("**") {
            return None;
        }

        let mut fields = trimmed[1..].split(',');
        let name = fields.next().unwrap_or("").trim().to_string();
        let params = fields
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(|field| match field.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
                None => (field.to_string(), None),
            })
            .collect();

        Some(Keyword { name, params })
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn marker(&self) -> Option<Marker> {
        MARKERS.get(self.normalized_name().as_str()).copied()
    }

    pub fn is(&self, marker: Marker) -> bool {
        self.marker() == Some(marker)
    }

    /// Value of a parameter, key matched case-insensitively
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_deref())
    }

    /// Whether a bare or valued parameter is present ("generate", "internal", ...)
    pub fn has_param(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Keyword(Keyword),
    Comment,
    Data,
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckLine {
    raw: String,                    // Line text including its terminator, if any
    pub kind: LineKind,
}

impl DeckLine {
    fn new(raw: String) -> DeckLine {
        let kind = classify_line(strip_terminator(&raw));
        DeckLine { raw, kind }
    }

    /// Text without the line terminator
    pub fn content(&self) -> &str {
        strip_terminator(&self.raw)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn keyword(&self) -> Option<&Keyword> {
        match &self.kind {
            LineKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    /// Comment text after the leading "**"
    pub fn comment(&self) -> Option<&str> {
        match self.kind {
            LineKind::Comment => Some(self.content().trim_start()[2..].trim()),
            _ => None,
        }
    }

    fn has_terminator(&self) -> bool {
        self.raw.ends_with('\n')
    }
}

fn strip_terminator(raw: &str) -> &str {
    let without_lf = raw.strip_suffix('\n').unwrap_or(raw);
    without_lf.strip_suffix('\r').unwrap_or(without_lf)
}

fn classify_line(content: &str) -> LineKind {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with("**") {
        LineKind::Comment
    } else if let Some(keyword) = Keyword::parse(trimmed) {
        LineKind::Keyword(keyword)
    } else {
        LineKind::Data
    }
}

/// A keyword line and the lines that follow it up to the next keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub start: usize,               // Index of the keyword line
    pub end: usize,                 // One past the last line of the section
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InpDeck {
    lines: Vec<DeckLine>,
    line_ending: String,            // "\n" or "\r\n", detected from the first terminated line
}

impl InpDeck {
    pub fn parse(text: &str) -> InpDeck {
        let lines: Vec<DeckLine> = text
            .split_inclusive('\n')
            .map(|raw| DeckLine::new(raw.to_string()))
            .collect();

        let line_ending = lines
            .iter()
            .find(|line| line.has_terminator())
            .map(|line| if line.raw.ends_with("\r\n") { "\r\n" } else { "\n" })
            .unwrap_or("\n")
            .to_string();

        InpDeck { lines, line_ending }
    }

    pub fn lines(&self) -> &[DeckLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_ending(&self) -> &str {
        &self.line_ending
    }

    pub fn to_text(&self) -> String {
        self.lines.iter().map(|line| line.raw.as_str()).collect()
    }

    /// All keyword sections in deck order
    pub fn sections(&self) -> Vec<Section> {
        let starts: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.keyword().is_some())
            .map(|(index, _)| index)
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| Section {
                start,
                end: starts.get(i + 1).copied().unwrap_or(self.lines.len()),
            })
            .collect()
    }

    pub fn keyword_at(&self, index: usize) -> Option<&Keyword> {
        self.lines.get(index).and_then(DeckLine::keyword)
    }

    /// Data lines of a section with their deck indices, comments and blanks skipped
    pub fn data_lines(&self, section: Section) -> impl Iterator<Item = (usize, &str)> {
        self.lines[section.start + 1..section.end]
            .iter()
            .enumerate()
            .filter(|(_, line)| line.kind == LineKind::Data)
            .map(move |(offset, line)| (section.start + 1 + offset, line.content()))
    }

    /// First line matching an anchor. Anchors starting with "**" match comment lines
    /// (whitespace and case insensitive), anything else matches a keyword by name.
    pub fn find_anchor(&self, anchor: &str) -> Option<usize> {
        let anchor = anchor.trim();
        if let Some(comment) = anchor.strip_prefix("**") {
            let wanted = normalize_comment(comment);
            self.lines
                .iter()
                .position(|line| line.comment().map(normalize_comment).as_deref() == Some(wanted.as_str()))
        } else {
            let wanted = Keyword::parse(anchor).map(|k| k.normalized_name())?;
            self.lines
                .iter()
                .position(|line| line.keyword().map(Keyword::normalized_name).as_deref() == Some(wanted.as_str()))
        }
    }

    /// Names given by every `*Nset, nset=...` line
    pub fn nset_names(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(DeckLine::keyword)
            .filter(|keyword| keyword.is(Marker::Nset))
            .filter_map(|keyword| keyword.param("nset").map(str::to_string))
            .collect()
    }

    /// Names given by "** Name: X   Type: Y" comments (what CAE writes above loads and fields)
    pub fn named_comments(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(DeckLine::comment)
            .filter_map(|comment| {
                let rest = comment.strip_prefix("Name:").or_else(|| comment.strip_prefix("NAME:"))?;
                // Names may contain spaces ("Predefined Field-1"), so cut at "Type:" instead
                let name = rest.split("Type:").next().unwrap_or(rest).trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect()
    }

    /// Insert text lines before the line at `index`
    pub fn insert_before(&mut self, index: usize, new_lines: &[String]) {
        let ending = self.line_ending.clone();
        let block: Vec<DeckLine> = new_lines
            .iter()
            .map(|text| DeckLine::new(format!("{}{}", text, ending)))
            .collect();
        self.lines.splice(index..index, block);
    }

    /// Insert text lines after the line at `index`
    ///
    /// When the anchor is the last line and has no terminator, it gets one and the
    /// inserted block becomes the unterminated tail instead.
    pub fn insert_after(&mut self, index: usize, new_lines: &[String]) {
        if new_lines.is_empty() {
            return;
        }
        let ending = self.line_ending.clone();
        let anchor_terminated = self.lines[index].has_terminator();
        if !anchor_terminated {
            self.lines[index].raw.push_str(&ending);
        }

        let count = new_lines.len();
        let block: Vec<DeckLine> = new_lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                if !anchor_terminated && i + 1 == count {
                    DeckLine::new(text.clone())
                } else {
                    DeckLine::new(format!("{}{}", text, ending))
                }
            })
            .collect();
        self.lines.splice(index + 1..index + 1, block);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = "*Heading\r\n** Job name: Job-1\r\n*Part, name=PART-1\r\n*Node\r\n      1,   0.,   0.,   0.\r\n*End Part\r\n*Assembly, name=Assembly\r\n*End Assembly\r\n** PREDEFINED FIELDS\r\n";

    #[test]
    fn test_round_trip_is_byte_identical() {
        for text in [DECK, "*Heading\nno newline at end", "", "\n\n*Node\n1, 0, 0, 0"] {
            assert_eq!(InpDeck::parse(text).to_text(), text);
        }
    }

    #[test]
    fn test_line_kinds() {
        let deck = InpDeck::parse(DECK);
        assert_eq!(deck.line_ending(), "\r\n");
        assert!(matches!(deck.lines()[0].kind, LineKind::Keyword(_)));
        assert_eq!(deck.lines()[1].kind, LineKind::Comment);
        assert_eq!(deck.lines()[4].kind, LineKind::Data);
        assert_eq!(deck.lines()[1].comment(), Some("Job name: Job-1"));
    }

    #[test]
    fn test_keyword_params() {
        let keyword = Keyword::parse("*Nset, NSET=Band_1, instance = PART-1_1-1, generate").unwrap();
        assert!(keyword.is(Marker::Nset));
        assert_eq!(keyword.param("nset"), Some("Band_1"));
        assert_eq!(keyword.param("Instance"), Some("PART-1_1-1"));
        assert!(keyword.has_param("GENERATE"));
        assert_eq!(keyword.param("generate"), None);
        assert!(Keyword::parse("** comment").is_none());
        assert!(Keyword::parse("1, 2, 3").is_none());
    }

    #[test]
    fn test_find_anchor_ignores_case_and_spacing() {
        let deck = InpDeck::parse(DECK);
        assert_eq!(deck.find_anchor("*END ASSEMBLY"), Some(7));
        assert_eq!(deck.find_anchor("**  predefined   fields"), Some(8));
        assert_eq!(deck.find_anchor("*End Step"), None);
    }

    #[test]
    fn test_sections_and_data_lines() {
        let deck = InpDeck::parse(DECK);
        let sections = deck.sections();
        let node_section = sections
            .iter()
            .find(|s| deck.keyword_at(s.start).map_or(false, |k| k.is(Marker::Node)))
            .copied()
            .unwrap();
        let data: Vec<_> = deck.data_lines(node_section).collect();
        assert_eq!(data, vec![(4, "      1,   0.,   0.,   0.")]);
    }

    #[test]
    fn test_insertions_use_deck_line_ending() {
        let mut deck = InpDeck::parse(DECK);
        deck.insert_before(7, &["*Nset, nset=A".to_string()]);
        deck.insert_after(9, &["X".to_string(), "Y".to_string()]);
        assert!(deck.to_text().ends_with("*Nset, nset=A\r\n*End Assembly\r\n** PREDEFINED FIELDS\r\nX\r\nY\r\n"));
    }

    #[test]
    fn test_insert_after_unterminated_last_line() {
        let mut deck = InpDeck::parse("*Step\n** PREDEFINED FIELDS");
        deck.insert_after(1, &["A".to_string(), "B".to_string()]);
        assert_eq!(deck.to_text(), "*Step\n** PREDEFINED FIELDS\nA\nB");
    }

    #[test]
    fn test_named_comments() {
        let deck = InpDeck::parse("** Name: predefinedfield-1-fieldband1   Type: Temperature\n** Other\n");
        assert_eq!(deck.named_comments(), vec!["predefinedfield-1-fieldband1".to_string()]);
    }
}
