use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use quick_xml::{Reader, events::Event};

use crate::{
    errors::{LemmatizerError, Result},
    utils::text::strip_markers,
};

/*
 The grammar corpus is a set of XML documents shaped like

   <Wordlist>
     <Paradigm lemma="па+йсці" tag="VP...">
       <Variant>
         <Form pos="V">па+йду</Form>
       </Variant>
     </Paradigm>
   </Wordlist>

 Lemmas and forms are returned with markers already stripped. A form takes its POS
 from its own `pos` attribute and falls back to the first character of the
 paradigm's `tag`.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub text: String,
    pub pos: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variant {
    pub forms: Vec<Form>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paradigm {
    pub lemma: String,
    pub variants: Vec<Variant>,
}

impl Paradigm {
    pub fn forms(&self) -> impl Iterator<Item = &Form> {
        self.variants.iter().flat_map(|variant| variant.forms.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDefect {
    MissingLemma,
    MissingFormText,
}

/// A paradigm or form dropped from the build because a required field is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCorpusRecord {
    pub path: PathBuf,
    pub lemma: Option<String>,
    pub defect: RecordDefect,
}

impl fmt::Display for MalformedCorpusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.defect, &self.lemma) {
            (RecordDefect::MissingLemma, _) => {
                write!(f, "{}: paradigm without lemma", self.path.display())
            }
            (RecordDefect::MissingFormText, Some(lemma)) => write!(
                f,
                "{}: form without text in paradigm '{}'",
                self.path.display(),
                lemma
            ),
            (RecordDefect::MissingFormText, None) => {
                write!(f, "{}: form without text", self.path.display())
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct CorpusDocument {
    pub paradigms: Vec<Paradigm>,
    pub skipped: Vec<MalformedCorpusRecord>,
}

#[derive(Default)]
struct ParadigmState {
    lemma: Option<String>,
    tag_pos: String,
    variants: Vec<Variant>,
    missing_form_texts: u32,
}

struct FormState {
    pos: String,
    text: String,
}

pub fn read_document(path: &Path) -> Result<CorpusDocument> {
    let bytes = fs::read(path)?;
    let xml = std::str::from_utf8(&bytes)
        .map_err(|e| LemmatizerError::malformed_corpus(path, e))?;
    parse_document(xml, path)
}

// Any XML syntax error aborts the document. Missing fields only skip the record.
pub fn parse_document(xml: &str, path: &Path) -> Result<CorpusDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut document = CorpusDocument::default();
    let mut paradigm: Option<ParadigmState> = None;
    let mut variant: Option<Variant> = None;
    let mut form: Option<FormState> = None;
    let mut depth: usize = 0;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed_at(path, &reader, e))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"Paradigm" => {
                        let lemma = attribute(&e, "lemma", path)?
                            .map(|lemma| strip_markers(lemma.trim()))
                            .filter(|lemma| !lemma.is_empty());
                        let tag_pos = attribute(&e, "tag", path)?
                            .and_then(|tag| tag.chars().next())
                            .map(String::from)
                            .unwrap_or_default();
                        paradigm = Some(ParadigmState {
                            lemma,
                            tag_pos,
                            ..ParadigmState::default()
                        });
                    }
                    b"Variant" if paradigm.is_some() => variant = Some(Variant::default()),
                    b"Form" if variant.is_some() => {
                        form = Some(FormState {
                            pos: form_pos(&e, paradigm.as_ref(), path)?,
                            text: String::new(),
                        });
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"Paradigm" => {
                    let lemma = attribute(&e, "lemma", path)?
                        .map(|lemma| strip_markers(lemma.trim()))
                        .filter(|lemma| !lemma.is_empty());
                    if lemma.is_none() {
                        document.skipped.push(MalformedCorpusRecord {
                            path: path.to_path_buf(),
                            lemma: None,
                            defect: RecordDefect::MissingLemma,
                        });
                    }
                }
                b"Form" if variant.is_some() => {
                    if let Some(state) = paradigm.as_mut() {
                        state.missing_form_texts += 1;
                    }
                }
                _ => {}
            },
            Event::Text(text) => {
                if let Some(state) = form.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| malformed_at(path, &reader, e))?;
                    state.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(state) = form.as_mut() {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| malformed_at(path, &reader, e))?;
                    state.text.push_str(text);
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                match e.name().as_ref() {
                    b"Form" => {
                        if let (Some(state), Some(current)) = (form.take(), variant.as_mut()) {
                            let text = strip_markers(state.text.trim());
                            if text.is_empty() {
                                if let Some(paradigm) = paradigm.as_mut() {
                                    paradigm.missing_form_texts += 1;
                                }
                            } else {
                                current.forms.push(Form {
                                    text,
                                    pos: state.pos,
                                });
                            }
                        }
                    }
                    b"Variant" => {
                        if let (Some(done), Some(state)) = (variant.take(), paradigm.as_mut()) {
                            state.variants.push(done);
                        }
                    }
                    b"Paradigm" => {
                        if let Some(state) = paradigm.take() {
                            finish_paradigm(state, path, &mut document);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(LemmatizerError::malformed_corpus(
            path,
            "unexpected end of document, unclosed elements remain",
        ));
    }
    Ok(document)
}

fn finish_paradigm(state: ParadigmState, path: &Path, document: &mut CorpusDocument) {
    let Some(lemma) = state.lemma else {
        document.skipped.push(MalformedCorpusRecord {
            path: path.to_path_buf(),
            lemma: None,
            defect: RecordDefect::MissingLemma,
        });
        return;
    };
    for _ in 0..state.missing_form_texts {
        document.skipped.push(MalformedCorpusRecord {
            path: path.to_path_buf(),
            lemma: Some(lemma.clone()),
            defect: RecordDefect::MissingFormText,
        });
    }
    document.paradigms.push(Paradigm {
        lemma,
        variants: state.variants,
    });
}

fn form_pos(
    e: &quick_xml::events::BytesStart<'_>,
    paradigm: Option<&ParadigmState>,
    path: &Path,
) -> Result<String> {
    let pos = attribute(e, "pos", path)?
        .map(|pos| pos.trim().to_string())
        .filter(|pos| !pos.is_empty());
    Ok(pos.unwrap_or_else(|| {
        paradigm
            .map(|state| state.tag_pos.clone())
            .unwrap_or_default()
    }))
}

fn attribute(
    e: &quick_xml::events::BytesStart<'_>,
    name: &str,
    path: &Path,
) -> Result<Option<String>> {
    let Some(attr) = e
        .try_get_attribute(name)
        .map_err(|err| LemmatizerError::malformed_corpus(path, err))?
    else {
        return Ok(None);
    };
    let value = attr
        .unescape_value()
        .map_err(|err| LemmatizerError::malformed_corpus(path, err))?;
    Ok(Some(value.into_owned()))
}

fn malformed_at<E: fmt::Display>(path: &Path, reader: &Reader<&[u8]>, err: E) -> LemmatizerError {
    LemmatizerError::malformed_corpus(
        path,
        format!("at byte {}: {}", reader.error_position(), err),
    )
}
