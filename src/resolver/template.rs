use pest::Parser;
use pest_derive::Parser;

use crate::error::EngineError;

#[derive(Parser)]
#[grammar = "resolver/template.pest"]
struct TemplateParser;

/// One segment of a parsed phrase template
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplatePart {
    Text(String),
    Slot(String),
}

/// Parse a phrase template such as `"show orders for {date}"`
pub(crate) fn parse_template(input: &str) -> Result<Vec<TemplatePart>, EngineError> {
    let mut pairs = TemplateParser::parse(Rule::template, input)
        .map_err(|err| EngineError::Template(err.to_string()))?;

    let template = pairs.next().unwrap();
    let mut parts = Vec::new();
    for pair in template.into_inner() {
        match pair.as_rule() {
            Rule::slot => {
                let ident = pair.into_inner().next().unwrap();
                parts.push(TemplatePart::Slot(ident.as_str().to_string()));
            }
            Rule::text => {
                let text = pair.as_str().trim();
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(text.to_string()));
                }
            }
            Rule::EOI => {}
            _ => unreachable!("unexpected rule in template: {:?}", pair.as_rule()),
        }
    }

    if parts.is_empty() {
        return Err(EngineError::EmptyTemplate);
    }
    Ok(parts)
}
