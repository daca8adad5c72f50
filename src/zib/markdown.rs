use crate::zib::model::FragmentKind;
use pulldown_cmark::{Options, Parser, html};

pub trait MarkdownConverter {
    fn convert(&self, raw: &str) -> String;
}

/// CommonMark with the usual GitHub-flavoured extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkConverter;

impl MarkdownConverter for CommonMarkConverter {
    fn convert(&self, raw: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let parser = Parser::new_ext(raw, options);
        let mut out = String::with_capacity(raw.len() + raw.len() / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Picks the converter for a fragment. Every kind is CommonMark for now.
pub fn converter_for(kind: FragmentKind) -> &'static dyn MarkdownConverter {
    static COMMON_MARK: CommonMarkConverter = CommonMarkConverter;
    match kind {
        FragmentKind::Local | FragmentKind::Reference => &COMMON_MARK,
    }
}
