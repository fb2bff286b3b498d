use serde::Serialize;
use serde_json::Value;

/// Envelope the grid widget expects, field names included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridResponse {
    #[serde(rename = "sEcho")]
    pub echo: Option<String>,
    #[serde(rename = "iTotalRecords")]
    pub total_records: u64,
    #[serde(rename = "iTotalDisplayRecords")]
    pub total_display_records: u64,
    #[serde(rename = "aaData")]
    pub data: Vec<Vec<Value>>,
}

pub trait ResponseEncoder {
    fn encode(&self, response: &GridResponse) -> Result<String, serde_json::Error>;
}

pub struct JsonEncoder;

impl ResponseEncoder for JsonEncoder {
    fn encode(&self, response: &GridResponse) -> Result<String, serde_json::Error> {
        serde_json::to_string(response)
    }
}

/// `<xml>` root, one element per key, list entries as `<item>`.
pub struct XmlEncoder;

impl ResponseEncoder for XmlEncoder {
    fn encode(&self, response: &GridResponse) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(response)?;
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        write_element(&mut out, "xml", &value);
        Ok(out)
    }
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, nested) in map {
                write_element(out, key, nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                write_element(out, "item", item);
            }
        }
        Value::String(s) => escape_into(out, s),
        other => escape_into(out, &other.to_string()),
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Xml,
}

impl OutputFormat {
    /// Format for a requested extension; anything unsupported is JSON.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "xml" => OutputFormat::Xml,
            _ => OutputFormat::Json,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Xml => "application/xml",
        }
    }

    pub fn encoder(&self) -> &'static dyn ResponseEncoder {
        match self {
            OutputFormat::Json => &JsonEncoder,
            OutputFormat::Xml => &XmlEncoder,
        }
    }

    pub fn encode(&self, response: &GridResponse) -> Result<String, serde_json::Error> {
        self.encoder().encode(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> GridResponse {
        GridResponse {
            echo: Some("3".into()),
            total_records: 2,
            total_display_records: 1,
            data: vec![vec![json!(1), json!("Tom & Jerry")]],
        }
    }

    #[test]
    fn json_keeps_wire_names() {
        let encoded = OutputFormat::from_extension("json").encode(&response()).unwrap();
        insta::assert_snapshot!(encoded, @r#"{"sEcho":"3","iTotalRecords":2,"iTotalDisplayRecords":1,"aaData":[[1,"Tom & Jerry"]]}"#);
    }

    #[test]
    fn xml_escapes_text() {
        let format = OutputFormat::from_extension(".XML");
        assert_eq!(format.content_type(), "application/xml");

        let encoded = format.encode(&response()).unwrap();
        insta::assert_snapshot!(encoded, @r#"
        <?xml version="1.0" encoding="utf-8"?>
        <xml><sEcho>3</sEcho><iTotalRecords>2</iTotalRecords><iTotalDisplayRecords>1</iTotalDisplayRecords><aaData><item><item>1</item><item>Tom &amp; Jerry</item></item></aaData></xml>
        "#);
    }

    #[test]
    fn unknown_extension_falls_back_to_json() {
        assert_eq!(OutputFormat::from_extension("csv"), OutputFormat::Json);
    }
}
