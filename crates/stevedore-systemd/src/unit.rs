//! Unit-file text codec built on `nom`.
//!
//! Converts between systemd unit text and the in-memory tree the
//! transformer works on: a mapping of unit names to section mappings,
//! each section a mapping of directive names to string values.
//!
//! A document may carry several units, delimited by `# unit: <name>`
//! marker comments. Rendering is deterministic: units sorted by name,
//! sections in conventional order (`Unit`, `Service`, `Install`, then
//! others sorted), directives sorted within each section, no trailing
//! newline.

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, space0},
    sequence::{delimited, preceded},
};
use stevedore_common::error::{Result, StevedoreError};
use stevedore_core::value::{Value, ValueMap};

/// Unit name used when a document carries no `# unit:` marker.
pub const IMPLICIT_UNIT: &str = "default.service";

fn section_header(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_till(|c| c == ']'), char(']')).parse(input)
}

fn unit_marker(input: &str) -> IResult<&str, &str> {
    preceded(
        (tag("#"), space0, tag("unit:"), space0),
        take_while1(|c: char| !c.is_whitespace()),
    )
    .parse(input)
}

fn directive(input: &str) -> IResult<&str, (&str, &str)> {
    let (rest, key) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-').parse(input)?;
    let (rest, _) = (space0, char('='), space0).parse(rest)?;
    Ok(("", (key, rest.trim_end())))
}

/// Parses unit-file text into the unit tree.
///
/// Comments (`#`, `;`) and blank lines are skipped; `# unit:` comments
/// start a new unit.
///
/// # Errors
///
/// Returns [`StevedoreError::UnsupportedDocument`] for directives outside
/// any section or lines that are neither header, directive, nor comment.
pub fn parse_units(text: &str) -> Result<Value> {
    let mut units = ValueMap::new();
    let mut unit_name = IMPLICIT_UNIT.to_owned();
    let mut sections = ValueMap::new();
    let mut section: Option<(String, ValueMap)> = None;

    let mut close_section =
        |sections: &mut ValueMap, section: &mut Option<(String, ValueMap)>| {
            if let Some((name, map)) = section.take() {
                sections.insert(name, Value::Mapping(map));
            }
        };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok((_, name)) = unit_marker(line) {
            close_section(&mut sections, &mut section);
            if !sections.is_empty() {
                let finished = std::mem::take(&mut sections);
                units.insert(std::mem::take(&mut unit_name), Value::Mapping(finished));
            }
            unit_name = name.to_owned();
            continue;
        }
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Ok((_, name)) = section_header(line) {
            close_section(&mut sections, &mut section);
            section = Some((name.to_owned(), ValueMap::new()));
            continue;
        }
        if let Ok((_, (key, value))) = directive(line) {
            match &mut section {
                Some((_, map)) => map.insert(key, Value::from(value)),
                None => {
                    return Err(StevedoreError::unsupported(format!(
                        "directive \"{key}\" outside any section"
                    )));
                }
            }
            continue;
        }
        return Err(StevedoreError::unsupported(format!(
            "unrecognized unit-file line: {line}"
        )));
    }
    close_section(&mut sections, &mut section);
    if !sections.is_empty() {
        units.insert(unit_name, Value::Mapping(sections));
    }
    Ok(Value::Mapping(units))
}

const SECTION_ORDER: [&str; 3] = ["Unit", "Service", "Install"];

fn section_rank(name: &str) -> usize {
    SECTION_ORDER
        .iter()
        .position(|&s| s == name)
        .unwrap_or(SECTION_ORDER.len())
}

/// Renders the unit tree as deterministic unit-file text.
///
/// # Errors
///
/// Returns [`StevedoreError::UnsupportedDocument`] when the tree does not
/// have the mapping-of-sections shape.
pub fn render_units(doc: &Value) -> Result<String> {
    let units = doc
        .as_mapping()
        .ok_or_else(|| StevedoreError::unsupported("unit document is not a mapping"))?;

    let mut out = String::new();
    for (unit_name, unit) in units.sorted_entries() {
        let sections = unit
            .as_mapping()
            .ok_or_else(|| StevedoreError::unsupported("unit is not a mapping of sections"))?;
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("# unit: {unit_name}\n"));

        let mut ordered = sections.sorted_entries();
        ordered.sort_by_key(|(name, _)| (section_rank(name), *name));
        for (section_name, section) in ordered {
            let directives = section.as_mapping().ok_or_else(|| {
                StevedoreError::unsupported("section is not a mapping of directives")
            })?;
            out.push_str(&format!("[{section_name}]\n"));
            for (key, value) in directives.sorted_entries() {
                let value = value.as_str().map_or_else(|| value.to_string(), str::to_owned);
                out.push_str(&format!("{key}={value}\n"));
            }
            out.push('\n');
        }
    }
    Ok(out.trim_end_matches('\n').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "# unit: api.service\n",
        "[Unit]\n",
        "Description=api container\n",
        "After=docker.service\n",
        "\n",
        "[Service]\n",
        "ExecStart=/usr/bin/docker run --rm --name api nginx:latest\n",
        "MemoryLimit=128M\n",
        "X-ContainerImage=nginx:latest\n",
        "\n",
        "[Install]\n",
        "WantedBy=multi-user.target\n",
    );

    #[test]
    fn parses_sections_and_directives() {
        let doc = parse_units(SAMPLE).expect("parse");
        let units = doc.as_mapping().expect("units");
        let unit = units.get("api.service").and_then(Value::as_mapping).expect("unit");
        let service = unit.get("Service").and_then(Value::as_mapping).expect("service");
        assert_eq!(service.get("MemoryLimit"), Some(&Value::from("128M")));
        assert_eq!(
            service.get("X-ContainerImage"),
            Some(&Value::from("nginx:latest"))
        );
    }

    #[test]
    fn document_without_marker_gets_the_implicit_unit_name() {
        let doc = parse_units("[Service]\nExecStart=/bin/true\n").expect("parse");
        assert!(doc.as_mapping().expect("units").contains_key(IMPLICIT_UNIT));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# a comment\n; another\n\n[Service]\nExecStart=/bin/true\n";
        let doc = parse_units(text).expect("parse");
        let units = doc.as_mapping().expect("units");
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn directive_values_keep_internal_equals_signs() {
        let doc = parse_units("[Service]\nEnvironment=\"A=1\" \"B=2\"\n").expect("parse");
        let service = doc
            .as_mapping()
            .and_then(|u| u.get(IMPLICIT_UNIT))
            .and_then(Value::as_mapping)
            .and_then(|s| s.get("Service"))
            .and_then(Value::as_mapping)
            .expect("service");
        assert_eq!(
            service.get("Environment"),
            Some(&Value::from("\"A=1\" \"B=2\""))
        );
    }

    #[test]
    fn directive_outside_a_section_is_unsupported() {
        assert!(parse_units("ExecStart=/bin/true\n").is_err());
    }

    #[test]
    fn render_orders_sections_conventionally_and_sorts_directives() {
        let doc = parse_units(SAMPLE).expect("parse");
        let rendered = render_units(&doc).expect("render");
        let expected = concat!(
            "# unit: api.service\n",
            "[Unit]\n",
            "After=docker.service\n",
            "Description=api container\n",
            "\n",
            "[Service]\n",
            "ExecStart=/usr/bin/docker run --rm --name api nginx:latest\n",
            "MemoryLimit=128M\n",
            "X-ContainerImage=nginx:latest\n",
            "\n",
            "[Install]\n",
            "WantedBy=multi-user.target",
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn parse_render_round_trip_is_stable() {
        let doc = parse_units(SAMPLE).expect("parse");
        let rendered = render_units(&doc).expect("render");
        let reparsed = parse_units(&rendered).expect("reparse");
        assert_eq!(doc, reparsed);
        assert_eq!(render_units(&reparsed).expect("rerender"), rendered);
    }

    #[test]
    fn multiple_units_render_sorted_by_name() {
        let text = concat!(
            "# unit: web.service\n",
            "[Service]\n",
            "ExecStart=/bin/web\n",
            "# unit: db.service\n",
            "[Service]\n",
            "ExecStart=/bin/db\n",
        );
        let rendered = render_units(&parse_units(text).expect("parse")).expect("render");
        let db = rendered.find("db.service").expect("db present");
        let web = rendered.find("web.service").expect("web present");
        assert!(db < web);
    }
}
