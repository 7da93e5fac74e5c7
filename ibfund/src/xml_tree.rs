// ibfund/src/xml_tree.rs
// In-memory XML document tree and relative-path selection.
//
// The broker report schemas are navigated with simple relative paths of the
// form `Tag/Child[@Attr='v']`. Each step moves along the child axis; a lone
// `.` selects the element itself. That is the entire grammar the report
// catalogs need, so nothing more is implemented.

use crate::base::FundError;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One element of a parsed report document. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
  pub tag: String,
  pub attributes: Vec<(String, String)>,
  pub text: Option<String>,
  pub children: Vec<Element>,
}

impl Element {
  fn new(tag: String, attributes: Vec<(String, String)>) -> Self {
    Element { tag, attributes, text: None, children: Vec::new() }
  }

  /// Value of the named attribute, if present.
  pub fn attr(&self, name: &str) -> Option<&str> {
    self.attributes.iter()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.as_str())
  }

  /// Text content of the element (trimmed), if any.
  pub fn text(&self) -> Option<&str> {
    self.text.as_deref()
  }

  /// All descendants matched by `selector`, relative to this element, in
  /// document order.
  pub fn find_all<'a>(&'a self, selector: &Selector) -> Vec<&'a Element> {
    selector.select(self)
  }
}

// Collect attributes of a start tag into owned (name, value) pairs.
fn read_attributes(e: &BytesStart) -> Result<Vec<(String, String)>, FundError> {
  let mut attrs = Vec::new();
  for attr_result in e.attributes() {
    let attr = attr_result.map_err(|err| {
      FundError::ParseError(format!("XML attribute parsing error: {}", err))
    })?;
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    let value = attr.unescape_value().map_err(|err| {
      FundError::ParseError(format!("Attribute value unescape error: {}", err))
    })?.into_owned();
    attrs.push((key, value));
  }
  Ok(attrs)
}

/// Parses a complete XML document into an `Element` tree rooted at the
/// document element.
pub fn parse_document(xml_data: &str) -> Result<Element, FundError> {
  let mut reader = Reader::from_str(xml_data);
  reader.trim_text(true);
  let mut buf = Vec::new();

  // Stack of open elements; the finished root pops out at the end.
  let mut stack: Vec<Element> = Vec::new();
  let mut root: Option<Element> = None;

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(e)) => {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attrs = read_attributes(&e)?;
        stack.push(Element::new(tag, attrs));
      }
      Ok(Event::Empty(e)) => {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attrs = read_attributes(&e)?;
        let element = Element::new(tag, attrs);
        match stack.last_mut() {
          Some(parent) => parent.children.push(element),
          None => {
            if root.is_some() {
              return Err(FundError::ParseError("Multiple root elements".into()));
            }
            root = Some(element);
          }
        }
      }
      Ok(Event::Text(t)) => {
        let value = t.unescape().map_err(|err| {
          FundError::ParseError(format!("Text unescape error: {}", err))
        })?.into_owned();
        if let Some(current) = stack.last_mut() {
          // Only the character run before the first child counts as the
          // element's text; trailing runs are ignored.
          if current.children.is_empty() && current.text.is_none() && !value.is_empty() {
            current.text = Some(value);
          }
        }
      }
      Ok(Event::CData(t)) => {
        let value = String::from_utf8_lossy(t.as_ref()).into_owned();
        if let Some(current) = stack.last_mut() {
          if current.children.is_empty() && current.text.is_none() && !value.is_empty() {
            current.text = Some(value);
          }
        }
      }
      Ok(Event::End(e)) => {
        let finished = stack.pop().ok_or_else(|| {
          FundError::ParseError(format!(
            "Unexpected closing tag </{}>",
            String::from_utf8_lossy(e.name().as_ref())
          ))
        })?;
        if finished.tag.as_bytes() != e.name().as_ref() {
          return Err(FundError::ParseError(format!(
            "Mismatched closing tag </{}> for <{}>",
            String::from_utf8_lossy(e.name().as_ref()), finished.tag
          )));
        }
        match stack.last_mut() {
          Some(parent) => parent.children.push(finished),
          None => {
            if root.is_some() {
              return Err(FundError::ParseError("Multiple root elements".into()));
            }
            root = Some(finished);
          }
        }
      }
      Ok(Event::Eof) => break,
      Err(err) => return Err(FundError::ParseError(format!("XML parsing error: {}", err))),
      _ => (), // Declarations, comments, processing instructions
    }
    buf.clear();
  }

  if !stack.is_empty() {
    return Err(FundError::ParseError(format!(
      "Unclosed element <{}> at end of document", stack[stack.len() - 1].tag
    )));
  }
  root.ok_or_else(|| FundError::ParseError("Document has no root element".into()))
}

/// One step of a relative path: a tag name plus zero or more
/// attribute-equality predicates, or `.` (the element itself).
#[derive(Debug, Clone, PartialEq)]
enum Step {
  SelfNode,
  Child { tag: String, predicates: Vec<(String, String)> },
}

/// A parsed relative path, e.g. `CoIDs/CoID[@Type='RepNo']`.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
  steps: Vec<Step>,
}

impl Selector {
  /// Parses a relative path. Steps are separated by `/`; each step is a tag
  /// name optionally followed by `[@Attr='value']` predicates (single or
  /// double quotes). A step of `.` selects the current element.
  pub fn parse(path: &str) -> Result<Self, FundError> {
    if path.is_empty() {
      return Err(FundError::SelectorError("Empty path".into()));
    }
    let mut steps = Vec::new();
    for raw_step in split_steps(path) {
      if raw_step == "." {
        steps.push(Step::SelfNode);
        continue;
      }
      steps.push(parse_child_step(raw_step, path)?);
    }
    Ok(Selector { steps })
  }

  /// All elements matched by this path relative to `root`, in document order.
  pub fn select<'a>(&self, root: &'a Element) -> Vec<&'a Element> {
    let mut current: Vec<&Element> = vec![root];
    for step in &self.steps {
      match step {
        Step::SelfNode => { /* Keep the current set */ }
        Step::Child { tag, predicates } => {
          let mut next = Vec::new();
          for el in &current {
            for child in &el.children {
              if child.tag == *tag && predicates_match(child, predicates) {
                next.push(child);
              }
            }
          }
          current = next;
        }
      }
    }
    current
  }
}

// Splits a path on `/`, ignoring separators inside quoted predicate values
// (e.g. `webSite[@mainCategory="Company Contact/E-mail"]`).
fn split_steps(path: &str) -> Vec<&str> {
  let mut steps = Vec::new();
  let mut start = 0;
  let mut in_quote: Option<char> = None;
  for (i, c) in path.char_indices() {
    match in_quote {
      Some(q) => {
        if c == q {
          in_quote = None;
        }
      }
      None => match c {
        '\'' | '"' => in_quote = Some(c),
        '/' => {
          steps.push(&path[start..i]);
          start = i + 1;
        }
        _ => {}
      },
    }
  }
  steps.push(&path[start..]);
  steps
}

fn predicates_match(el: &Element, predicates: &[(String, String)]) -> bool {
  predicates.iter().all(|(name, value)| el.attr(name) == Some(value.as_str()))
}

fn parse_child_step(raw: &str, full_path: &str) -> Result<Step, FundError> {
  let bracket = raw.find('[');
  let tag = &raw[..bracket.unwrap_or(raw.len())];
  if tag.is_empty() {
    return Err(FundError::SelectorError(format!("Empty step in path '{}'", full_path)));
  }

  let mut predicates = Vec::new();
  let mut rest = &raw[tag.len()..];
  while !rest.is_empty() {
    // Each predicate is [@Name='value'] or [@Name="value"].
    if !rest.starts_with("[@") {
      return Err(FundError::SelectorError(format!(
        "Expected '[@' in step '{}' of path '{}'", raw, full_path
      )));
    }
    rest = &rest[2..];
    let eq = rest.find('=').ok_or_else(|| FundError::SelectorError(format!(
      "Missing '=' in predicate of step '{}' in path '{}'", raw, full_path
    )))?;
    let attr_name = &rest[..eq];
    rest = &rest[eq + 1..];
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')
      .ok_or_else(|| FundError::SelectorError(format!(
        "Predicate value must be quoted in step '{}' of path '{}'", raw, full_path
      )))?;
    rest = &rest[1..];
    let close = rest.find(quote).ok_or_else(|| FundError::SelectorError(format!(
      "Unterminated quote in step '{}' of path '{}'", raw, full_path
    )))?;
    let value = &rest[..close];
    rest = &rest[close + 1..];
    if !rest.starts_with(']') {
      return Err(FundError::SelectorError(format!(
        "Expected ']' in step '{}' of path '{}'", raw, full_path
      )));
    }
    rest = &rest[1..];
    predicates.push((attr_name.to_string(), value.to_string()));
  }

  Ok(Step::Child { tag: tag.to_string(), predicates })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_doc() -> Element {
    let xml = r#"
<Report>
    <CoIDs>
        <CoID Type="RepNo">8030</CoID>
        <CoID Type="CompanyName">Test Corp</CoID>
    </CoIDs>
    <Issues>
        <Issue ID="1" Type="C">
            <IssueID Type="Ticker">TST</IssueID>
            <Exchange Code="NYSE" Country="USA">New York Stock Exchange</Exchange>
        </Issue>
        <Issue ID="2" Type="P">
            <IssueID Type="Ticker">TST.P</IssueID>
        </Issue>
    </Issues>
    <Empty/>
</Report>
        "#;
    parse_document(xml).expect("parse failed")
  }

  #[test]
  fn test_parse_basic_structure() {
    let doc = sample_doc();
    assert_eq!(doc.tag, "Report");
    assert_eq!(doc.children.len(), 3);
    assert_eq!(doc.children[0].tag, "CoIDs");
    assert_eq!(doc.children[2].tag, "Empty");
    assert!(doc.children[2].text.is_none());
  }

  #[test]
  fn test_text_and_attributes() {
    let doc = sample_doc();
    let coid = &doc.children[0].children[0];
    assert_eq!(coid.attr("Type"), Some("RepNo"));
    assert_eq!(coid.text(), Some("8030"));
    assert_eq!(coid.attr("Nope"), None);
  }

  #[test]
  fn test_select_with_predicate() {
    let doc = sample_doc();
    let sel = Selector::parse("CoIDs/CoID[@Type=\"CompanyName\"]").unwrap();
    let matches = doc.find_all(&sel);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].text(), Some("Test Corp"));
  }

  #[test]
  fn test_select_multiple_matches_document_order() {
    let doc = sample_doc();
    let sel = Selector::parse("Issues/Issue").unwrap();
    let matches = doc.find_all(&sel);
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].attr("ID"), Some("1"));
    assert_eq!(matches[1].attr("ID"), Some("2"));
  }

  #[test]
  fn test_select_self() {
    let doc = sample_doc();
    let sel = Selector::parse(".").unwrap();
    let matches = doc.find_all(&sel);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].tag, "Report");
  }

  #[test]
  fn test_select_multiple_predicates() {
    let xml = r#"
<peerInfo lastUpdated="2024-01-01T00:00:00">
    <IndustryInfo>
        <Industry type="NAICS" order="1" code="511210">Software Publishers</Industry>
        <Industry type="NAICS" order="2" code="334111">Computer Manufacturing</Industry>
        <Industry type="SIC" order="1" code="7372">Prepackaged Software</Industry>
    </IndustryInfo>
</peerInfo>
        "#;
    let doc = parse_document(xml).unwrap();
    let sel = Selector::parse("IndustryInfo/Industry[@type=\"NAICS\"][@order=\"2\"]").unwrap();
    let matches = doc.find_all(&sel);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].attr("code"), Some("334111"));
  }

  #[test]
  fn test_select_no_matches() {
    let doc = sample_doc();
    let sel = Selector::parse("Issues/Issue[@Type='X']/IssueID").unwrap();
    assert!(doc.find_all(&sel).is_empty());
  }

  #[test]
  fn test_slash_inside_quoted_predicate() {
    let xml = r#"
<Report>
    <webLinks>
        <webSite mainCategory="Home Page">https://example.com</webSite>
        <webSite mainCategory="Company Contact/E-mail">ir@example.com</webSite>
    </webLinks>
</Report>
        "#;
    let doc = parse_document(xml).unwrap();
    let sel = Selector::parse(r#"webLinks/webSite[@mainCategory="Company Contact/E-mail"]"#).unwrap();
    let matches = doc.find_all(&sel);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].text(), Some("ir@example.com"));
  }

  #[test]
  fn test_selector_syntax_errors() {
    assert!(Selector::parse("").is_err());
    assert!(Selector::parse("A//B").is_err());
    assert!(Selector::parse("A[@x=y]").is_err());
    assert!(Selector::parse("A[@x='y'").is_err());
  }

  #[test]
  fn test_parse_rejects_malformed_document() {
    assert!(parse_document("<A><B></A>").is_err());
    assert!(parse_document("").is_err());
  }

  #[test]
  fn test_entity_unescaping() {
    let doc = parse_document(r#"<A name="a &amp; b">x &lt; y</A>"#).unwrap();
    assert_eq!(doc.attr("name"), Some("a & b"));
    assert_eq!(doc.text(), Some("x < y"));
  }
}
