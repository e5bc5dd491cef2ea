// rzpchat-cli/src/rendering.rs

//! Terminal rendering of assistant replies.
//!
//! Prose and tables go through termimad; fenced code blocks (the JSON fallback
//! of the formatter, mostly) are highlighted with syntect.

use anyhow::Result;
use lazy_static::lazy_static;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use pulldown_cmark_to_cmark::{cmark, Error as CmarkError};
use std::io::{self, Write};
use syntect::{
    easy::HighlightLines,
    highlighting::{Color as SyntectColor, FontStyle, Style, Theme, ThemeSet},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};
use termimad::{
    crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
    Error as TermimadError, MadSkin,
};

const THEME_NAME: &str = "base16-ocean.dark";

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref CODE_THEME: Option<&'static Theme> = THEME_SET
        .themes
        .get(THEME_NAME)
        .or_else(|| THEME_SET.themes.values().next());
}

fn syntect_to_crossterm_color(color: SyntectColor) -> Option<Color> {
    (color.a > 0).then_some(Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    })
}

fn syntax_token(language: Option<&str>) -> Option<&'static str> {
    let lang = language?.trim().to_lowercase();
    Some(match lang.as_str() {
        "json" | "jsonc" => "json",
        "shell" | "bash" | "sh" | "curl" => "bash",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "javascript" | "js" | "node" => "javascript",
        "python" | "py" => "python",
        "php" => "php",
        "java" => "java",
        "go" | "golang" => "go",
        _ => return None,
    })
}

fn highlight_code<W: Write>(writer: &mut W, code: &str, language: Option<&str>) -> Result<(), io::Error> {
    let Some(theme) = *CODE_THEME else {
        return write!(writer, "{}", code);
    };
    let syntax = syntax_token(language)
        .and_then(|token| SYNTAX_SET.find_syntax_by_token(token))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, theme);

    for line in LinesWithEndings::from(code) {
        let ranges: Vec<(Style, &str)> = highlighter
            .highlight_line(line, &SYNTAX_SET)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        for (style, content) in ranges {
            match syntect_to_crossterm_color(style.foreground) {
                Some(fg) => write!(writer, "{}", SetForegroundColor(fg))?,
                None => write!(writer, "{}", ResetColor)?,
            }
            let bold = style.font_style.contains(FontStyle::BOLD);
            if bold {
                write!(writer, "{}", SetAttribute(Attribute::Bold))?;
            }
            write!(writer, "{}", content)?;
            if bold {
                write!(writer, "{}", SetAttribute(Attribute::Reset))?;
            }
        }
        write!(writer, "{}", ResetColor)?;
    }
    Ok(())
}

fn create_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.inline_code.set_fg(Color::Cyan);
    skin.inline_code.set_bg(Color::Reset);
    skin.bold.set_fg(Color::Yellow);
    skin.code_block.set_bg(Color::Reset);
    skin
}

fn flush_markdown<W: Write>(events: &mut Vec<Event<'_>>, skin: &MadSkin, writer: &mut W) -> Result<(), io::Error> {
    if events.is_empty() {
        return Ok(());
    }
    let mut md = String::new();
    cmark(events.iter(), &mut md).map_err(|e: CmarkError| {
        io::Error::new(io::ErrorKind::Other, format!("Markdown generation error: {}", e))
    })?;
    skin.write_text_on(writer, &md).map_err(|e: TermimadError| {
        io::Error::new(io::ErrorKind::Other, format!("Termimad rendering error: {}", e))
    })?;
    events.clear();
    Ok(())
}

/// Renders Markdown to `writer`.
pub fn render_markdown<W: Write>(writer: &mut W, markdown: &str) -> Result<()> {
    let skin = create_skin();
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);

    let mut pending: Vec<Event<'_>> = Vec::new();
    let mut code = String::new();
    let mut language: Option<String> = None;
    let mut in_code_block = false;

    for event in parser {
        match &event {
            Event::Start(Tag::CodeBlock(kind)) => {
                flush_markdown(&mut pending, &skin, writer)?;
                in_code_block = true;
                language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                code.clear();
            }
            Event::End(TagEnd::CodeBlock) if in_code_block => {
                highlight_code(writer, &code, language.as_deref())?;
                writeln!(writer)?;
                in_code_block = false;
                language = None;
            }
            Event::Text(text) if in_code_block => code.push_str(text),
            _ if in_code_block => {}
            _ => pending.push(event.clone()),
        }
    }
    flush_markdown(&mut pending, &skin, writer)?;
    Ok(())
}

/// Prints an assistant reply, raw when `plain` is set.
pub fn print_formatted(markdown: &str, plain: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if plain {
        writeln!(stdout, "{}", markdown)?;
    } else {
        render_markdown(&mut stdout, markdown)?;
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        let mut out = Vec::new();
        render_markdown(&mut out, markdown).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_renders_prose_and_table_cells() {
        let out = render("**Order**\n\n| Field | Value |\n|---|---|\n| Status | paid |\n");
        assert!(out.contains("Order"));
        assert!(out.contains("paid"));
    }

    #[test]
    fn test_code_block_content_survives_highlighting() {
        let out = render("```json\n{\"id\": \"cust_1\"}\n```");
        assert!(out.contains("cust_1"));
    }

    #[test]
    fn test_syntax_token() {
        assert_eq!(syntax_token(Some("JSON")), Some("json"));
        assert_eq!(syntax_token(Some("curl")), Some("bash"));
        assert_eq!(syntax_token(Some("brainfuck")), None);
        assert_eq!(syntax_token(None), None);
    }
}
