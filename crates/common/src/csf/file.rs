// Story module model: verbatim chunks interleaved with story export
// declarations that can be edited in place.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};

use super::ident::{is_valid_identifier, sanitize, story_name_from_export, to_id};
use super::lexer::{depth_delta, matching_close, tokenize, Token, TokenKind};
use super::literal::{render_key, render_value, unquote};
use super::object::ObjectLit;
use super::{line_at, line_indent, CsfError};

/// Keywords that begin a new top-level statement when they start a line.
const STATEMENT_KEYWORDS: &[&str] = &[
    "export", "import", "const", "let", "var", "function", "class", "type", "interface", "enum",
    "declare",
];

/// Words that continue an expression across a line break.
const CONTINUATION_KEYWORDS: &[&str] = &["satisfies", "as", "instanceof", "in", "of"];

/// Story export name -> story record.
pub type StoryTable = BTreeMap<String, StoryRecord>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    pub export_name: String,
    pub generated_id: String,
}

/// Handle to one story declaration inside a [`CsfFile`].
///
/// Only meaningful for the file that produced it.
#[derive(Debug, PartialEq, Eq)]
pub struct MutationTarget {
    chunk: usize,
    export_name: String,
}

impl MutationTarget {
    pub fn export_name(&self) -> &str {
        &self.export_name
    }
}

#[derive(Debug, Clone)]
pub struct CsfFile {
    chunks: Vec<Chunk>,
    title: String,
    meta_id: Option<String>,
    /// Every top-level binding name, exported or not.
    declared: BTreeSet<String>,
}

#[derive(Debug, Clone)]
enum Chunk {
    Verbatim(String),
    Story(StoryDecl),
}

/// `<head><export_name><between><init><after>`, e.g.
/// `export const ` `Primary` `: Story = ` `{ ... }` `;`.
#[derive(Debug, Clone)]
struct StoryDecl {
    head: String,
    export_name: String,
    between: String,
    init: StoryInit,
    after: String,
}

#[derive(Debug, Clone)]
enum StoryInit {
    Object(ObjectLit),
    /// Function stories, `Template.bind({})`, and other expressions.
    Opaque(String),
}

impl StoryDecl {
    fn render_into(&self, out: &mut String) {
        out.push_str(&self.head);
        out.push_str(&self.export_name);
        out.push_str(&self.between);
        match &self.init {
            StoryInit::Object(object) => out.push_str(&object.render()),
            StoryInit::Opaque(text) => out.push_str(text),
        }
        out.push_str(&self.after);
    }
}

impl CsfFile {
    /// Parse a story module. `file_name` supplies the title when the default
    /// export does not declare one.
    pub fn parse(file_name: &str, source: &str) -> Result<Self, CsfError> {
        let tokens = tokenize(source)?;
        let mut parser = FileParser {
            source,
            tokens: &tokens,
            chunks: Vec::new(),
            copied_to: 0,
            declared: BTreeSet::new(),
            object_bindings: HashMap::new(),
            meta: MetaSource::Missing,
        };
        parser.run()?;

        let meta = parser.resolve_meta()?;
        let title = meta
            .as_ref()
            .and_then(|meta| string_property(meta, "title"))
            .unwrap_or_else(|| title_from_file_name(file_name));
        let meta_id = meta.as_ref().and_then(|meta| string_property(meta, "id"));

        if sanitize(meta_id.as_deref().unwrap_or(&title)).is_empty() {
            return Err(CsfError::InvalidTitle(title));
        }

        Ok(Self { chunks: parser.chunks, title, meta_id, declared: parser.declared })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn meta_id(&self) -> Option<&str> {
        self.meta_id.as_deref()
    }

    /// Stories keyed by export name, each with its generated id.
    pub fn stories(&self) -> StoryTable {
        let kind = self.meta_id.as_deref().unwrap_or(&self.title);
        self.story_decls()
            .filter_map(|decl| {
                let generated_id = to_id(kind, &story_name_from_export(&decl.export_name))?;
                Some((
                    decl.export_name.clone(),
                    StoryRecord { export_name: decl.export_name.clone(), generated_id },
                ))
            })
            .collect()
    }

    /// Story export names in source order.
    pub fn story_exports(&self) -> Vec<&str> {
        self.story_decls().map(|decl| decl.export_name.as_str()).collect()
    }

    pub fn story_target(&self, export_name: &str) -> Option<MutationTarget> {
        self.story_index(export_name)
            .map(|chunk| MutationTarget { chunk, export_name: export_name.to_string() })
    }

    /// Parsed `args` of an object story, if it has an object literal there.
    pub fn story_args(&self, export_name: &str) -> Option<ObjectLit> {
        let decl = self.story_decls().find(|decl| decl.export_name == export_name)?;
        let StoryInit::Object(object) = &decl.init else {
            return None;
        };
        ObjectLit::parse(&object.property("args")?.value).ok()
    }

    /// Append a copy of `source` named `new_name` at the end of the module.
    ///
    /// The copy keeps every property of the original except `args`, which the
    /// caller is expected to fill in.
    pub fn duplicate_story(
        &mut self,
        source: &str,
        new_name: &str,
    ) -> Result<MutationTarget, CsfError> {
        if !is_valid_identifier(new_name) {
            return Err(CsfError::InvalidExportName(new_name.to_string()));
        }
        if self.declared.contains(new_name) {
            return Err(CsfError::ExportExists(new_name.to_string()));
        }

        let index =
            self.story_index(source).ok_or_else(|| CsfError::UnknownStory(source.to_string()))?;
        let Chunk::Story(decl) = &self.chunks[index] else {
            return Err(CsfError::UnknownStory(source.to_string()));
        };
        let StoryInit::Object(object) = &decl.init else {
            return Err(CsfError::StoryNotObject(source.to_string()));
        };

        let mut object = object.clone();
        object.remove_property("args");
        let copy = StoryDecl {
            head: decl.head.clone(),
            export_name: new_name.to_string(),
            between: decl.between.clone(),
            init: StoryInit::Object(object),
            after: decl.after.clone(),
        };

        if !self.serialize().ends_with('\n') {
            self.chunks.push(Chunk::Verbatim("\n".to_string()));
        }
        self.chunks.push(Chunk::Verbatim("\n".to_string()));
        self.chunks.push(Chunk::Story(copy));
        let chunk = self.chunks.len() - 1;
        self.chunks.push(Chunk::Verbatim("\n".to_string()));
        self.declared.insert(new_name.to_string());

        Ok(MutationTarget { chunk, export_name: new_name.to_string() })
    }

    /// Write `args` into the target story's `args` object, replacing values of
    /// keys already present and appending the rest.
    pub fn apply_args(
        &mut self,
        target: &MutationTarget,
        args: &Map<String, Value>,
    ) -> Result<(), CsfError> {
        let unknown = || CsfError::UnknownStory(target.export_name.clone());
        let Some(Chunk::Story(decl)) = self.chunks.get_mut(target.chunk) else {
            return Err(unknown());
        };
        if decl.export_name != target.export_name {
            return Err(unknown());
        }
        let StoryInit::Object(object) = &mut decl.init else {
            return Err(CsfError::StoryNotObject(target.export_name.clone()));
        };

        if object.property("args").is_none() {
            // One-line stories get one-line args.
            if !object.is_empty() && !object.render().contains('\n') {
                object.set_property("args", "args", render_value(&Value::Object(args.clone())));
                return Ok(());
            }
            object.set_property("args", "args", "{}".to_string());
        }
        let indent = object.entry_indent("args");
        let not_object = || CsfError::ArgsNotObject(target.export_name.clone());
        let property = object.property_mut("args").ok_or_else(not_object)?;
        let mut args_object =
            ObjectLit::parse(&property.value).map_err(|_| not_object())?.with_indent(indent);

        for (key, value) in args {
            args_object.set_property(key, &render_key(key), render_value(value));
        }
        property.value = args_object.render();
        Ok(())
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Verbatim(text) => out.push_str(text),
                Chunk::Story(decl) => decl.render_into(&mut out),
            }
        }
        out
    }

    fn story_decls(&self) -> impl Iterator<Item = &StoryDecl> + '_ {
        self.chunks.iter().filter_map(|chunk| match chunk {
            Chunk::Story(decl) => Some(decl),
            Chunk::Verbatim(_) => None,
        })
    }

    fn story_index(&self, export_name: &str) -> Option<usize> {
        self.chunks.iter().position(
            |chunk| matches!(chunk, Chunk::Story(decl) if decl.export_name == export_name),
        )
    }
}

enum MetaSource {
    Missing,
    Inline(ObjectLit),
    Binding(String),
}

struct FileParser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    chunks: Vec<Chunk>,
    copied_to: usize,
    declared: BTreeSet<String>,
    /// Top-level bindings initialized with an object literal: name -> (open, close) token indices.
    object_bindings: HashMap<String, (usize, usize)>,
    meta: MetaSource,
}

impl<'a> FileParser<'a> {
    fn run(&mut self) -> Result<(), CsfError> {
        let mut index = 0;
        let mut depth = 0isize;

        while index < self.tokens.len() {
            let token = self.tokens[index];
            if depth == 0 {
                if token.is_ident(self.source, "export") {
                    if let Some(next) = self.parse_export(index)? {
                        index = next;
                        continue;
                    }
                } else if self.is_binding_keyword(index) {
                    self.parse_local_binding(index);
                } else if self.is_declaration_keyword(index) {
                    self.declare_name_at(index + 1);
                }
            }
            depth += depth_delta(&token, self.source);
            index += 1;
        }

        self.chunks.push(Chunk::Verbatim(self.source[self.copied_to..].to_string()));
        Ok(())
    }

    /// Handle `export ...` at `index`. Returns the index to resume scanning
    /// from when a story declaration was consumed.
    fn parse_export(&mut self, index: usize) -> Result<Option<usize>, CsfError> {
        let source = self.source;
        let tokens = self.tokens;
        let Some(next) = tokens.get(index + 1) else {
            return Ok(None);
        };

        if next.is_ident(source, "default") {
            self.parse_default_export(index + 2)?;
            return Ok(None);
        }
        if self.is_declaration_keyword(index + 1) {
            self.declare_name_at(index + 2);
            return Ok(None);
        }
        if !self.is_binding_keyword(index + 1) {
            return Ok(None);
        }

        let Some(name_token) = tokens.get(index + 2).filter(|t| t.kind == TokenKind::Ident)
        else {
            return Ok(None);
        };
        let export_name = name_token.text(source).to_string();
        self.declared.insert(export_name.clone());

        let Some(equals) = self.find_initializer(index + 3) else {
            return Ok(None);
        };
        let Some(init_first) = self.tokens.get(equals + 1).copied() else {
            return Ok(None);
        };

        let (init, init_end, statement_last) = if init_first.is_punct(source, "{") {
            let close = self.close_of(equals + 1)?;
            self.object_bindings.insert(export_name.clone(), (equals + 1, close));
            let text = &source[init_first.start..self.tokens[close].end];
            let object =
                ObjectLit::parse(text)?.with_indent(line_indent(source, self.tokens[index].start));
            let (expression_last, semicolon) = self.scan_statement(close + 1, close);
            (StoryInit::Object(object), self.tokens[close].end, semicolon.unwrap_or(expression_last))
        } else {
            let (expression_last, semicolon) = self.scan_statement(equals + 1, equals + 1);
            let init_end = self.tokens[expression_last].end;
            (
                StoryInit::Opaque(source[init_first.start..init_end].to_string()),
                init_end,
                semicolon.unwrap_or(expression_last),
            )
        };

        if export_name.starts_with("__") {
            return Ok(Some(statement_last + 1));
        }

        let statement_start = self.tokens[index].start;
        let statement_end = self.tokens[statement_last].end;
        self.chunks.push(Chunk::Verbatim(source[self.copied_to..statement_start].to_string()));
        self.chunks.push(Chunk::Story(StoryDecl {
            head: source[statement_start..name_token.start].to_string(),
            export_name,
            between: source[name_token.end..init_first.start].to_string(),
            init,
            after: source[init_end..statement_end].to_string(),
        }));
        self.copied_to = statement_end;

        Ok(Some(statement_last + 1))
    }

    fn parse_default_export(&mut self, index: usize) -> Result<(), CsfError> {
        let Some(first) = self.tokens.get(index).copied() else {
            return Ok(());
        };
        if first.is_punct(self.source, "{") {
            let close = self.close_of(index)?;
            let text = &self.source[first.start..self.tokens[close].end];
            self.meta = MetaSource::Inline(ObjectLit::parse(text)?);
        } else if first.kind == TokenKind::Ident && !self.is_declaration_keyword(index) {
            self.meta = MetaSource::Binding(first.text(self.source).to_string());
        }
        Ok(())
    }

    fn parse_local_binding(&mut self, index: usize) {
        let Some(name_token) = self.tokens.get(index + 1).filter(|t| t.kind == TokenKind::Ident)
        else {
            return;
        };
        let name = name_token.text(self.source).to_string();
        self.declared.insert(name.clone());

        let Some(equals) = self.find_initializer(index + 2) else {
            return;
        };
        if self.tokens.get(equals + 1).is_some_and(|t| t.is_punct(self.source, "{")) {
            if let Some(close) = matching_close(self.tokens, self.source, equals + 1) {
                self.object_bindings.insert(name, (equals + 1, close));
            }
        }
    }

    fn resolve_meta(&self) -> Result<Option<ObjectLit>, CsfError> {
        match &self.meta {
            MetaSource::Missing => Ok(None),
            MetaSource::Inline(object) => Ok(Some(object.clone())),
            MetaSource::Binding(name) => match self.object_bindings.get(name) {
                Some((open, close)) => {
                    let text = &self.source[self.tokens[*open].start..self.tokens[*close].end];
                    ObjectLit::parse(text).map(Some)
                }
                None => Ok(None),
            },
        }
    }

    fn declare_name_at(&mut self, index: usize) {
        if let Some(token) = self.tokens.get(index).filter(|t| t.kind == TokenKind::Ident) {
            self.declared.insert(token.text(self.source).to_string());
        }
    }

    fn is_binding_keyword(&self, index: usize) -> bool {
        self.tokens.get(index).is_some_and(|token| {
            token.kind == TokenKind::Ident
                && matches!(token.text(self.source), "const" | "let" | "var")
        })
    }

    fn is_declaration_keyword(&self, index: usize) -> bool {
        self.tokens.get(index).is_some_and(|token| {
            token.kind == TokenKind::Ident && matches!(token.text(self.source), "function" | "class")
        })
    }

    fn close_of(&self, open: usize) -> Result<usize, CsfError> {
        matching_close(self.tokens, self.source, open).ok_or_else(|| CsfError::Unbalanced {
            delimiter: '{',
            line: line_at(self.source, self.tokens[open].start),
        })
    }

    /// Index of the `=` that starts a binding's initializer, skipping any
    /// type annotation.
    fn find_initializer(&self, from: usize) -> Option<usize> {
        let mut depth = 0isize;
        for index in from..self.tokens.len() {
            let token = &self.tokens[index];
            if depth == 0 {
                if token.is_punct(self.source, "=") {
                    return Some(index);
                }
                if token.is_punct(self.source, ";") || self.starts_statement(index) {
                    return None;
                }
            }
            depth += depth_delta(token, self.source);
            if depth < 0 {
                return None;
            }
        }
        None
    }

    /// Walk the rest of a top-level statement starting at `from`. Returns the
    /// last token before the terminating `;` (`fallback` when there is none)
    /// and the index of the `;` when present. Tokens up to `fallback` never
    /// end the statement.
    fn scan_statement(&self, from: usize, fallback: usize) -> (usize, Option<usize>) {
        let mut last = fallback;
        let mut depth = 0isize;
        for index in from..self.tokens.len() {
            let token = &self.tokens[index];
            if depth == 0 {
                if token.is_punct(self.source, ";") {
                    return (last, Some(index));
                }
                if index > fallback && self.starts_statement(index) {
                    return (last, None);
                }
            }
            depth += depth_delta(token, self.source);
            if depth < 0 {
                return (last, None);
            }
            last = index;
        }
        (last, None)
    }

    /// Whether the token at `index` begins a new statement: it starts a line
    /// and either is a declaration keyword or cannot continue the previous
    /// expression.
    fn starts_statement(&self, index: usize) -> bool {
        let Some(previous) = index.checked_sub(1).and_then(|i| self.tokens.get(i)) else {
            return false;
        };
        let token = &self.tokens[index];
        if !self.source[previous.end..token.start].contains('\n') {
            return false;
        }

        let text = token.text(self.source);
        if token.kind == TokenKind::Ident && STATEMENT_KEYWORDS.contains(&text) {
            return true;
        }

        let starts_operand = match token.kind {
            TokenKind::Ident => !CONTINUATION_KEYWORDS.contains(&text),
            TokenKind::Number | TokenKind::Str | TokenKind::Template | TokenKind::Jsx => true,
            TokenKind::Regex | TokenKind::Punct => false,
        };
        let previous_ends_operand = match previous.kind {
            TokenKind::Punct => matches!(previous.text(self.source), ")" | "]" | "}"),
            _ => true,
        };
        starts_operand && previous_ends_operand
    }
}

fn string_property(object: &ObjectLit, key: &str) -> Option<String> {
    unquote(object.property(key)?.value.trim())
}

/// `src/Button.stories.tsx` -> `Button`.
fn title_from_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    for marker in [".stories.", ".story."] {
        if let Some(index) = base.find(marker) {
            return base[..index].to_string();
        }
    }
    match base.rfind('.') {
        Some(index) if index > 0 => base[..index].to_string(),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const BUTTON_STORIES: &str = r#"import type { Meta, StoryObj } from '@storybook/react';

import { Button } from './Button';

const meta = {
  title: 'Example/Button',
  component: Button,
  // `args` on the meta are shared by every story
  args: { onClick: fn() },
} satisfies Meta<typeof Button>;

export default meta;
type Story = StoryObj<typeof meta>;

export const Primary: Story = {
  args: {
    primary: true,
    label: 'Button',
  },
};

export const Secondary: Story = {
  args: {
    label: 'Button',
  },
};

export const Large = {
  args: { size: 'large', label: 'Button' },
} satisfies Story
"#;

    fn args_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn parse(source: &str) -> CsfFile {
        CsfFile::parse("src/stories/Button.stories.tsx", source).expect("story file should parse")
    }

    #[test]
    fn serializes_unmodified_file_verbatim() {
        assert_eq!(parse(BUTTON_STORIES).serialize(), BUTTON_STORIES);
    }

    #[test]
    fn builds_story_table_from_meta_title() {
        let file = parse(BUTTON_STORIES);
        assert_eq!(file.title(), "Example/Button");
        assert_eq!(file.story_exports(), vec!["Primary", "Secondary", "Large"]);

        let table = file.stories();
        assert_eq!(table.len(), 3);
        assert_eq!(table["Primary"].generated_id, "example-button--primary");
        assert_eq!(table["Large"].generated_id, "example-button--large");
    }

    #[test]
    fn inline_default_export_and_meta_id() {
        let source = "export default { title: 'Forms/Input', id: 'custom-input' };\nexport const WithValue = {};\n";
        let file = parse(source);
        assert_eq!(file.title(), "Forms/Input");
        assert_eq!(file.meta_id(), Some("custom-input"));
        assert_eq!(file.stories()["WithValue"].generated_id, "custom-input--with-value");
    }

    #[test]
    fn title_falls_back_to_file_name() {
        let file = CsfFile::parse("Button.stories.tsx", "export const Primary = {};\n").unwrap();
        assert_eq!(file.title(), "Button");
        assert_eq!(file.stories()["Primary"].generated_id, "button--primary");

        assert_eq!(title_from_file_name("src\\Card.story.jsx"), "Card");
        assert_eq!(title_from_file_name("Avatar.tsx"), "Avatar");
    }

    #[test]
    fn function_stories_and_internal_exports() {
        let source = r#"export default { title: 'Legacy' };
const Template = (args) => <Button {...args} />;
export const Basic = Template.bind({});
Basic.args = { label: 'Basic' };
export const Rendered = () => <Button label="x" />
export const __namedExportsOrder = ['Basic', 'Rendered'];
"#;
        let file = parse(source);
        assert_eq!(file.story_exports(), vec!["Basic", "Rendered"]);
        assert_eq!(file.serialize(), source);

        let target = file.story_target("Basic").unwrap();
        let mut file = file;
        assert_eq!(
            file.apply_args(&target, &args_map(json!({ "label": "x" }))),
            Err(CsfError::StoryNotObject("Basic".into()))
        );
    }

    #[test]
    fn render_functions_with_jsx_text() {
        let source = r#"export default { title: 'Notice' };

export const Warning = {
  args: { label: 'Go' },
  render: (args) => <p>Don't click {args.label}</p>,
};
export const Empty = {};
"#;
        let mut file = parse(source);
        assert_eq!(file.story_exports(), vec!["Warning", "Empty"]);

        let target = file.story_target("Warning").unwrap();
        file.apply_args(&target, &args_map(json!({ "label": "Stop" }))).unwrap();
        assert_eq!(file.serialize(), source.replace("label: 'Go'", "label: 'Stop'"));
    }

    #[test]
    fn statements_without_semicolons() {
        let source = "export default { title: 'Bare' }\nexport const One = { args: { a: 1 } }\nexport const Two = {}\n";
        let file = parse(source);
        assert_eq!(file.story_exports(), vec!["One", "Two"]);
        assert_eq!(file.serialize(), source);
    }

    #[test]
    fn updates_existing_args_in_place() {
        let mut file = parse(BUTTON_STORIES);
        let target = file.story_target("Primary").unwrap();
        file.apply_args(&target, &args_map(json!({ "label": "Click", "size": "small" })))
            .unwrap();

        let expected = BUTTON_STORIES.replace(
            "    primary: true,\n    label: 'Button',\n  },\n};\n\nexport const Secondary",
            "    primary: true,\n    label: 'Click',\n    size: 'small',\n  },\n};\n\nexport const Secondary",
        );
        assert_eq!(file.serialize(), expected);
        assert_eq!(file.story_exports().len(), 3);
    }

    #[test]
    fn adds_args_property_when_missing() {
        let mut file = parse("export const Empty = {};\nexport const Named = { name: 'Named story' };\n");
        let target = file.story_target("Empty").unwrap();
        file.apply_args(&target, &args_map(json!({ "label": "Click" }))).unwrap();
        let target = file.story_target("Named").unwrap();
        file.apply_args(&target, &args_map(json!({ "count": 2 }))).unwrap();

        assert_eq!(
            file.serialize(),
            "export const Empty = {\n  args: {\n    label: 'Click',\n  },\n};\nexport const Named = { name: 'Named story', args: { count: 2 } };\n"
        );
    }

    #[test]
    fn rejects_args_that_are_not_object_literals() {
        let mut file = parse("const base = { a: 1 };\nexport const Shared = { args: base };\n");
        let target = file.story_target("Shared").unwrap();
        assert_eq!(
            file.apply_args(&target, &args_map(json!({ "a": 2 }))),
            Err(CsfError::ArgsNotObject("Shared".into()))
        );
    }

    #[test]
    fn duplicates_story_without_args() {
        let mut file = parse(BUTTON_STORIES);
        let target = file.duplicate_story("Primary", "PrimaryLong").unwrap();
        assert_eq!(target.export_name(), "PrimaryLong");
        file.apply_args(&target, &args_map(json!({ "label": "Long label" }))).unwrap();

        let expected = format!(
            "{BUTTON_STORIES}\nexport const PrimaryLong: Story = {{\n  args: {{\n    label: 'Long label',\n  }},\n}};\n"
        );
        assert_eq!(file.serialize(), expected);
        assert_eq!(file.story_exports(), vec!["Primary", "Secondary", "Large", "PrimaryLong"]);
        assert_eq!(file.stories()["PrimaryLong"].generated_id, "example-button--primary-long");

        let original = file.story_args("Primary").unwrap();
        assert_eq!(original.property("label").unwrap().value, "'Button'");
    }

    #[test]
    fn duplicate_keeps_other_properties_and_satisfies_clause() {
        let mut file = parse(BUTTON_STORIES);
        let target = file.duplicate_story("Large", "Huge").unwrap();
        file.apply_args(&target, &args_map(json!({ "size": "huge" }))).unwrap();

        assert!(file
            .serialize()
            .ends_with("} satisfies Story\n\nexport const Huge = {\n  args: {\n    size: 'huge',\n  },\n} satisfies Story\n"));
    }

    #[test]
    fn duplicate_rejects_collisions_and_bad_names() {
        let mut file = parse(BUTTON_STORIES);
        assert_eq!(
            file.duplicate_story("Primary", "Secondary"),
            Err(CsfError::ExportExists("Secondary".into()))
        );
        assert_eq!(
            file.duplicate_story("Primary", "meta"),
            Err(CsfError::ExportExists("meta".into()))
        );
        assert_eq!(
            file.duplicate_story("Primary", "Primary Long"),
            Err(CsfError::InvalidExportName("Primary Long".into()))
        );
        assert_eq!(
            file.duplicate_story("Missing", "Copy"),
            Err(CsfError::UnknownStory("Missing".into()))
        );
        assert_eq!(file.serialize(), BUTTON_STORIES);
    }

    #[test]
    fn duplicate_rejects_function_stories() {
        let mut file = parse("export default { title: 'T' };\nexport const Fn = () => null;\n");
        assert_eq!(file.duplicate_story("Fn", "Copy"), Err(CsfError::StoryNotObject("Fn".into())));
    }

    #[test]
    fn duplicate_appends_newline_when_file_lacks_one() {
        let mut file = parse("export const A = { args: { x: 1 } };");
        file.duplicate_story("A", "B").unwrap();
        assert_eq!(
            file.serialize(),
            "export const A = { args: { x: 1 } };\n\nexport const B = { };\n"
        );
    }

    #[test]
    fn reapplying_same_args_is_stable() {
        let args = args_map(json!({ "label": "Click", "tags": ["a", "b"], "style": { "color": "red" } }));
        let mut file = parse(BUTTON_STORIES);
        let target = file.story_target("Secondary").unwrap();
        file.apply_args(&target, &args).unwrap();
        let first = file.serialize();

        let mut reparsed = parse(&first);
        let target = reparsed.story_target("Secondary").unwrap();
        reparsed.apply_args(&target, &args).unwrap();
        assert_eq!(reparsed.serialize(), first);
    }

    #[test]
    fn stale_target_is_rejected() {
        let file = parse(BUTTON_STORIES);
        let target = file.story_target("Primary").unwrap();
        let mut other = parse("export const Other = {};\n");
        assert_eq!(
            other.apply_args(&target, &Map::new()),
            Err(CsfError::UnknownStory("Primary".into()))
        );
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(
            CsfFile::parse("Broken.stories.tsx", "export const A = {\n  args: {\n"),
            Err(CsfError::Unbalanced { .. })
        ));
        assert_eq!(
            CsfFile::parse("Broken.stories.tsx", "export const A = 'oops\n").err(),
            Some(CsfError::Unterminated { what: "string literal", line: 1 })
        );
        assert_eq!(
            CsfFile::parse("x.stories.tsx", "export default { title: '///' };\n").err(),
            Some(CsfError::InvalidTitle("///".into()))
        );
    }
}
