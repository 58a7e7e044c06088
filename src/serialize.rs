use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::graph::{AttrValue, Attributes, Graph};

const GEXF_NS: &str = "http://www.gexf.net/1.2draft";
const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const CREATOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Output document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Gexf,
    Graphml,
}

impl Format {
    pub fn file_name(self) -> &'static str {
        match self {
            Format::Gexf => "output.gexf",
            Format::Graphml => "output.graphml",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::Gexf => "application/gexf+xml",
            Format::Graphml => "application/graphml+xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Gexf => write!(f, "gexf"),
            Format::Graphml => write!(f, "graphml"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gexf" => Ok(Format::Gexf),
            "graphml" => Ok(Format::Graphml),
            _ => Err(format!("unknown format {s:?}: expected gexf or graphml")),
        }
    }
}

/// Render `graph` as a complete document.
pub fn serialize(graph: &Graph, format: Format) -> Result<String> {
    validate(graph)?;

    let node_attrs = declare(graph.nodes().map(|n| &n.attributes));
    let edge_attrs = declare(graph.edges().map(|e| &e.attributes));

    let doc = match format {
        Format::Gexf => write_gexf(graph, &node_attrs, &edge_attrs),
        Format::Graphml => write_graphml(graph, &node_attrs, &edge_attrs),
    };
    debug!(%format, bytes = doc.len(), "serialized graph");
    Ok(doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrType {
    Long,
    String,
}

impl AttrType {
    fn as_str(self) -> &'static str {
        match self {
            AttrType::Long => "long",
            AttrType::String => "string",
        }
    }
}

#[derive(Debug)]
struct AttrDecl {
    name: String,
    kind: AttrType,
}

/// One declaration per attribute name, in first-seen order. A column is
/// `long` only if every value in it is an integer.
fn declare<'a>(records: impl Iterator<Item = &'a Attributes>) -> Vec<AttrDecl> {
    let mut decls: Vec<AttrDecl> = Vec::new();
    for attributes in records {
        for (name, value) in attributes {
            let kind = if value.is_int() {
                AttrType::Long
            } else {
                AttrType::String
            };
            match decls.iter_mut().find(|d| d.name == *name) {
                Some(decl) if kind == AttrType::String => decl.kind = AttrType::String,
                Some(_) => {}
                None => decls.push(AttrDecl {
                    name: name.clone(),
                    kind,
                }),
            }
        }
    }
    decls
}

fn position(decls: &[AttrDecl], name: &str) -> usize {
    decls.iter().position(|d| d.name == name).unwrap_or_default()
}

fn validate(graph: &Graph) -> Result<()> {
    for node in graph.nodes() {
        check_text("label", &node.label)?;
        check_attributes(&node.attributes)?;
    }
    for edge in graph.edges() {
        check_attributes(&edge.attributes)?;
    }
    Ok(())
}

fn check_attributes(attributes: &Attributes) -> Result<()> {
    for (name, value) in attributes {
        check_text(name, name)?;
        if let AttrValue::Str(s) = value {
            check_text(name, s)?;
        }
    }
    Ok(())
}

/// XML 1.0 forbids most control characters even when escaped.
fn check_text(attribute: &str, text: &str) -> Result<()> {
    let bad = text.chars().find(|&c| {
        matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}')
    });
    match bad {
        Some(c) => Err(ConvertError::Serialization {
            attribute: attribute.to_string(),
            reason: format!("character U+{:04X} is not allowed in XML", c as u32),
        }),
        None => Ok(()),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(text);
    out.push('\n');
}

fn write_gexf(graph: &Graph, node_attrs: &[AttrDecl], edge_attrs: &[AttrDecl]) -> String {
    let mut out = String::new();
    line(&mut out, 0, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    line(
        &mut out,
        0,
        &format!(
            r#"<gexf xmlns="{GEXF_NS}" xmlns:xsi="{XSI_NS}" xsi:schemaLocation="{GEXF_NS} {GEXF_NS}/gexf.xsd" version="1.2">"#
        ),
    );
    line(&mut out, 1, "<meta>");
    line(&mut out, 2, &format!("<creator>{}</creator>", escape(CREATOR)));
    line(&mut out, 1, "</meta>");
    line(&mut out, 1, r#"<graph defaultedgetype="directed" mode="static">"#);

    for (class, decls) in [("node", node_attrs), ("edge", edge_attrs)] {
        if decls.is_empty() {
            continue;
        }
        line(&mut out, 2, &format!(r#"<attributes class="{class}" mode="static">"#));
        for (id, decl) in decls.iter().enumerate() {
            line(
                &mut out,
                3,
                &format!(
                    r#"<attribute id="{id}" title="{}" type="{}"/>"#,
                    escape(&decl.name),
                    decl.kind.as_str()
                ),
            );
        }
        line(&mut out, 2, "</attributes>");
    }

    line(&mut out, 2, "<nodes>");
    for node in graph.nodes() {
        let label = escape(&node.label);
        let open = format!(r#"<node id="{label}" label="{label}""#);
        write_gexf_element(&mut out, &open, "node", &node.attributes, node_attrs);
    }
    line(&mut out, 2, "</nodes>");

    line(&mut out, 2, "<edges>");
    for edge in graph.edges() {
        let mut open = format!(
            r#"<edge id="{}" source="{}" target="{}""#,
            edge.key,
            escape(&edge.source),
            escape(&edge.target)
        );
        if let Some((_, AttrValue::Int(w))) = edge.attributes.iter().find(|(n, _)| n == "weight") {
            open.push_str(&format!(r#" weight="{w}""#));
        }
        write_gexf_element(&mut out, &open, "edge", &edge.attributes, edge_attrs);
    }
    line(&mut out, 2, "</edges>");

    line(&mut out, 1, "</graph>");
    line(&mut out, 0, "</gexf>");
    out
}

fn write_gexf_element(
    out: &mut String,
    open: &str,
    tag: &str,
    attributes: &Attributes,
    decls: &[AttrDecl],
) {
    if attributes.is_empty() {
        line(out, 3, &format!("{open}/>"));
        return;
    }

    line(out, 3, &format!("{open}>"));
    line(out, 4, "<attvalues>");
    for (name, value) in attributes {
        line(
            out,
            5,
            &format!(
                r#"<attvalue for="{}" value="{}"/>"#,
                position(decls, name),
                escape(&value.to_string())
            ),
        );
    }
    line(out, 4, "</attvalues>");
    line(out, 3, &format!("</{tag}>"));
}

fn write_graphml(graph: &Graph, node_attrs: &[AttrDecl], edge_attrs: &[AttrDecl]) -> String {
    // Keys are numbered across both classes: nodes first, then edges.
    let edge_offset = node_attrs.len();

    let mut out = String::new();
    line(&mut out, 0, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    line(
        &mut out,
        0,
        &format!(
            r#"<graphml xmlns="{GRAPHML_NS}" xmlns:xsi="{XSI_NS}" xsi:schemaLocation="{GRAPHML_NS} {GRAPHML_NS}/1.0/graphml.xsd">"#
        ),
    );

    let keys = node_attrs
        .iter()
        .map(|d| ("node", d))
        .chain(edge_attrs.iter().map(|d| ("edge", d)));
    for (id, (class, decl)) in keys.enumerate() {
        line(
            &mut out,
            1,
            &format!(
                r#"<key id="d{id}" for="{class}" attr.name="{}" attr.type="{}"/>"#,
                escape(&decl.name),
                decl.kind.as_str()
            ),
        );
    }

    line(&mut out, 1, r#"<graph edgedefault="directed">"#);
    for node in graph.nodes() {
        let open = format!(r#"<node id="{}""#, escape(&node.label));
        write_graphml_element(&mut out, &open, "node", &node.attributes, node_attrs, 0);
    }
    for edge in graph.edges() {
        let open = format!(
            r#"<edge id="{}" source="{}" target="{}""#,
            edge.key,
            escape(&edge.source),
            escape(&edge.target)
        );
        write_graphml_element(&mut out, &open, "edge", &edge.attributes, edge_attrs, edge_offset);
    }
    line(&mut out, 1, "</graph>");
    line(&mut out, 0, "</graphml>");
    out
}

fn write_graphml_element(
    out: &mut String,
    open: &str,
    tag: &str,
    attributes: &Attributes,
    decls: &[AttrDecl],
    offset: usize,
) {
    if attributes.is_empty() {
        line(out, 2, &format!("{open}/>"));
        return;
    }

    line(out, 2, &format!("{open}>"));
    for (name, value) in attributes {
        line(
            out,
            3,
            &format!(
                r#"<data key="d{}">{}</data>"#,
                offset + position(decls, name),
                escape(&value.to_string())
            ),
        );
    }
    line(out, 2, &format!("</{tag}>"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build, BuildSpec, DanglingPolicy};
    use crate::table::{Delimiter, Table, TableKind};

    fn graph(nodes: Option<&str>, edges: &str, attributes: &[&str]) -> Graph {
        let nodes = nodes.map(|raw| Table::load(TableKind::Nodes, raw.as_bytes(), Delimiter::COMMA).unwrap());
        let edges = Table::load(TableKind::Edges, edges.as_bytes(), Delimiter::COMMA).unwrap();
        let spec = BuildSpec {
            source: "source".to_string(),
            target: "target".to_string(),
            label: Some("label".to_string()),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            dangling: DanglingPolicy::Create,
        };
        build(nodes.as_ref(), &edges, &spec).unwrap()
    }

    #[test]
    fn test_gexf_counts() {
        let g = graph(None, "source,target\np,q\n", &[]);
        let doc = serialize(&g, Format::Gexf).unwrap();
        assert_eq!(doc.matches("<node ").count(), 2);
        assert_eq!(doc.matches("<edge ").count(), 1);
        assert!(doc.contains(r#"defaultedgetype="directed""#));
        assert!(!doc.contains("<attributes"));
    }

    #[test]
    fn test_gexf_attribute_types() {
        let g = graph(None, "source,target,weight,note\na,b,3,x\na,c,4,7\n", &["weight", "note"]);
        let doc = serialize(&g, Format::Gexf).unwrap();
        assert!(doc.contains(r#"<attribute id="0" title="weight" type="long"/>"#));
        assert!(doc.contains(r#"<attribute id="1" title="note" type="string"/>"#));
        assert!(doc.contains(r#"<edge id="0" source="a" target="b" weight="3">"#));
        assert!(doc.contains(r#"<attvalue for="1" value="7"/>"#));
    }

    #[test]
    fn test_graphml_keys() {
        let g = graph(
            Some("label,age\na,30\nb,40\n"),
            "source,target,relation_type\na,b,knows\n",
            &["relation_type"],
        );
        let doc = serialize(&g, Format::Graphml).unwrap();
        assert!(doc.contains(r#"<key id="d0" for="node" attr.name="age" attr.type="long"/>"#));
        assert!(doc.contains(r#"<key id="d1" for="edge" attr.name="relation_type" attr.type="string"/>"#));
        assert!(doc.contains(r#"<data key="d1">knows</data>"#));
        assert!(doc.contains(r#"<edge id="0" source="a" target="b">"#));
    }

    #[test]
    fn test_escaping() {
        let g = graph(None, "source,target,note\n\"a&b\",<c>,\"say \"\"hi\"\"\"\n", &["note"]);
        let doc = serialize(&g, Format::Gexf).unwrap();
        assert!(doc.contains(r#"<node id="a&amp;b" label="a&amp;b"/>"#));
        assert!(doc.contains(r#"<node id="&lt;c&gt;" label="&lt;c&gt;"/>"#));
        assert!(doc.contains("value=\"say &quot;hi&quot;\""));
    }

    #[test]
    fn test_control_character_fails() {
        let g = graph(None, "source,target,note\na,b,x\u{1}y\n", &["note"]);
        let err = serialize(&g, Format::Graphml).unwrap_err();
        match err {
            ConvertError::Serialization { attribute, reason } => {
                assert_eq!(attribute, "note");
                assert!(reason.contains("U+0001"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!(Format::Gexf.file_name(), "output.gexf");
        assert_eq!(Format::Graphml.file_name(), "output.graphml");
        assert_eq!("GraphML".parse::<Format>().unwrap(), Format::Graphml);
        assert!("dot".parse::<Format>().is_err());
    }
}
