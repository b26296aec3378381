//! Copy-to-clipboard for code samples
//!
//! Works on rendered panel HTML: find `code-block` divs, attach a copy
//! button to each one, and turn a block back into plain code text that can be
//! put on the clipboard. The system clipboard is tried first; when it is not
//! available an OSC 52 escape sequence asks the terminal to do it instead.

use std::io::{IsTerminal, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{error, info};

use crate::error::{GuideError, Result};
use crate::events::{CopyMethod, EventBus, GuideEvent};

/// Label of freshly attached buttons
pub const DEFAULT_BUTTON_TEXT: &str = "Copiar";

/// Shown when neither backend could copy
pub const MANUAL_COPY_HINT: &str = "Não foi possível copiar automaticamente. Selecione o código manualmente e use Ctrl+C (ou Cmd+C no Mac).";

static DIV_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").unwrap());
static CLASS_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bclass\s*=\s*"([^"]*)""#).unwrap());
static COPY_BUTTON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<button[^>]*class="copy-btn"[^>]*>(.*?)</button>"#).unwrap()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").unwrap());

/// A code sample found in panel HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Position among the panel's code blocks, from 0
    pub index: usize,
    /// Inner HTML of the block
    pub html: String,
    /// Plain code text, ready for the clipboard
    pub code: String,
}

/// Byte offsets of one code block: `<div ...>` body `</div>`
struct BlockSpan {
    start: usize,
    open_end: usize,
    close_start: usize,
    end: usize,
}

fn has_code_block_class(open_tag: &str) -> bool {
    CLASS_ATTR_RE
        .captures(open_tag)
        .map_or(false, |caps| caps[1].split_whitespace().any(|c| c == "code-block"))
}

/// Outermost `code-block` divs, matched against their own closing tag so
/// nested divs stay inside the block. Unbalanced blocks are skipped.
fn code_block_spans(html: &str) -> Vec<BlockSpan> {
    let mut spans = Vec::new();
    // One entry per open div; `Some(start, open_end)` for a code block.
    let mut open: Vec<Option<(usize, usize)>> = Vec::new();

    for caps in DIV_TAG_RE.captures_iter(html) {
        let Some(tag) = caps.get(0) else { continue };
        if &caps[1] == "/" {
            if let Some(Some((start, open_end))) = open.pop() {
                spans.push(BlockSpan {
                    start,
                    open_end,
                    close_start: tag.start(),
                    end: tag.end(),
                });
            }
        } else {
            let inside_block = open.iter().any(Option::is_some);
            let is_block = !inside_block && has_code_block_class(tag.as_str());
            open.push(is_block.then_some((tag.start(), tag.end())));
        }
    }

    spans.sort_by_key(|span| span.start);
    spans
}

/// Every `code-block` in `html`, in document order
pub fn find_code_blocks(html: &str) -> Vec<CodeBlock> {
    code_block_spans(html)
        .into_iter()
        .enumerate()
        .map(|(index, span)| {
            let inner = &html[span.open_end..span.close_start];
            CodeBlock {
                index,
                html: inner.to_string(),
                code: extract_code_text(inner),
            }
        })
        .collect()
}

/// Plain text of a code block: copy button removed, tags stripped, entities
/// decoded, runs of blank lines collapsed to one.
pub fn extract_code_text(block_html: &str) -> String {
    let without_button = COPY_BUTTON_RE.replace_all(block_html, "");
    let text = TAG_RE.replace_all(&without_button, "");
    let text = decode_entities(&text);
    BLANK_RUN_RE.replace_all(text.trim(), "\n\n").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Attach a copy button to every code block that does not have one yet.
/// Running it twice changes nothing.
pub fn attach_copy_buttons(html: &str, label: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for span in code_block_spans(html) {
        let open_tag = &html[span.start..span.open_end];
        let body = &html[span.open_end..span.close_start];
        out.push_str(&html[last..span.start]);
        last = span.end;

        if open_tag.contains("data-copy-added") || COPY_BUTTON_RE.is_match(body) {
            out.push_str(&html[span.start..span.end]);
            continue;
        }

        out.push_str(&open_tag[..open_tag.len() - 1]);
        out.push_str(r#" data-copy-added="true">"#);
        out.push_str(body);
        out.push_str(&format!(
            r#"<button class="copy-btn" aria-label="Copiar código" title="Copiar código para a área de transferência">{label}</button>"#
        ));
        out.push_str(&html[span.close_start..span.end]);
    }

    out.push_str(&html[last..]);
    out
}

/// OSC 52 "set clipboard" sequence for `text`
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

/// Somewhere text can be copied to
pub trait ClipboardBackend: Send + Sync {
    fn method(&self) -> CopyMethod;
    fn write_text(&self, text: &str) -> std::result::Result<(), String>;
}

/// The desktop clipboard
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardBackend for SystemClipboard {
    fn method(&self) -> CopyMethod {
        CopyMethod::ClipboardApi
    }

    fn write_text(&self, text: &str) -> std::result::Result<(), String> {
        use cli_clipboard::{ClipboardContext, ClipboardProvider};

        let mut ctx = ClipboardContext::new().map_err(|e| e.to_string())?;
        ctx.set_contents(text.to_owned()).map_err(|e| e.to_string())
    }
}

/// Asks the attached terminal to set the clipboard
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalClipboard;

impl ClipboardBackend for TerminalClipboard {
    fn method(&self) -> CopyMethod {
        CopyMethod::Fallback
    }

    fn write_text(&self, text: &str) -> std::result::Result<(), String> {
        let mut stdout = std::io::stdout();
        if !stdout.is_terminal() {
            return Err("stdout is not a terminal".to_string());
        }
        stdout
            .write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| e.to_string())
    }
}

pub struct CodeCopyManager {
    primary: Box<dyn ClipboardBackend>,
    fallback: Box<dyn ClipboardBackend>,
    bus: EventBus,
    button_text: String,
}

impl CodeCopyManager {
    pub fn new(
        primary: Box<dyn ClipboardBackend>,
        fallback: Box<dyn ClipboardBackend>,
        bus: EventBus,
    ) -> Self {
        Self {
            primary,
            fallback,
            bus,
            button_text: DEFAULT_BUTTON_TEXT.to_string(),
        }
    }

    /// System clipboard first, terminal escape second
    pub fn system(bus: EventBus) -> Self {
        Self::new(Box::new(SystemClipboard), Box::new(TerminalClipboard), bus)
    }

    pub fn button_text(&self) -> &str {
        &self.button_text
    }

    /// Change the label used for new buttons
    pub fn set_button_text(&mut self, text: impl Into<String>) {
        self.button_text = text.into();
    }

    /// Attach buttons labelled with the current button text
    pub fn attach_copy_buttons(&self, html: &str) -> String {
        attach_copy_buttons(html, &self.button_text)
    }

    /// Relabel attached buttons that still carry the default label
    pub fn relabel_buttons(&self, html: &str) -> String {
        COPY_BUTTON_RE
            .replace_all(html, |caps: &Captures| {
                if &caps[1] == DEFAULT_BUTTON_TEXT {
                    caps[0].replacen(
                        &format!(">{}</button>", DEFAULT_BUTTON_TEXT),
                        &format!(">{}</button>", self.button_text),
                        1,
                    )
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Put `text` on the clipboard, falling back when the primary backend fails
    pub fn copy_text(&self, text: &str) -> Result<CopyMethod> {
        let primary_err = match self.primary.write_text(text) {
            Ok(()) => return Ok(self.copied(self.primary.method())),
            Err(e) => e,
        };
        error!("Erro ao copiar com {}: {}", self.primary.method().as_str(), primary_err);

        match self.fallback.write_text(text) {
            Ok(()) => Ok(self.copied(self.fallback.method())),
            Err(fallback_err) => {
                error!("Erro ao copiar com fallback: {}", fallback_err);
                Err(GuideError::clipboard(format!(
                    "{} ({}; {})",
                    MANUAL_COPY_HINT, primary_err, fallback_err
                )))
            }
        }
    }

    /// Copy the `index`-th code block of a panel
    pub fn copy_block(&self, html: &str, index: usize) -> Result<CopyMethod> {
        let blocks = find_code_blocks(html);
        let block = blocks.get(index).ok_or(GuideError::CodeBlockNotFound {
            index,
            available: blocks.len(),
        })?;
        self.copy_text(&block.code)
    }

    fn copied(&self, method: CopyMethod) -> CopyMethod {
        info!("Código copiado usando método: {}", method.as_str());
        self.bus.publish(GuideEvent::CodeCopied { method });
        method
    }
}

impl std::fmt::Debug for CodeCopyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeCopyManager")
            .field("primary", &self.primary.method())
            .field("fallback", &self.fallback.method())
            .field("button_text", &self.button_text)
            .finish()
    }
}
