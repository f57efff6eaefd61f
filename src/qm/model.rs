//! Typed QM resources
//!
//! QM answers with one XML element per resource whose children carry
//! namespace prefixes that differ between servers, so fields are matched by
//! local name. Related resources are kept as their URLs.

use super::QmProject;
use crate::client::Client;
use crate::document::XmlElement;
use crate::error::{Error, Result};
use crate::fetch::Fetched;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use std::time::Duration;

/// Namespaces declared on the root of a saved resource
const NAMESPACES: [(&str, &str); 3] = [
    ("xmlns:alm", "http://jazz.net/xmlns/alm/v0.1/"),
    ("xmlns:qm", "http://jazz.net/xmlns/alm/qm/v0.1/"),
    (
        "xmlns:qmresult",
        "http://jazz.net/xmlns/alm/qm/v0.1/executionresult/v0.1",
    ),
];

/// A resource of the QM integration service.
pub trait QmResource: Sized + Send + Sync + 'static {
    /// Resource type in service URLs, e.g. `testcase`
    const RESOURCE_ID: &'static str;

    /// Decode the resource element of a response.
    fn from_xml(root: &XmlElement) -> Result<Self>;

    /// URL of the resource; empty for a resource not yet saved.
    fn href(&self) -> &str;

    fn set_href(&mut self, href: String);

    /// Fields sent when saving, by qualified element name. Empty values
    /// are left out of the request.
    fn save_fields(&self) -> Vec<(&'static str, QmField<'_>)> {
        Vec::new()
    }
}

/// Value of a saved field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QmField<'a> {
    Text(&'a str),
    Int(i64),
    Time(Option<&'a DateTime<FixedOffset>>),
    /// Link to another resource, written as `href` attribute
    Ref(&'a str),
    Variables(&'a BTreeMap<String, String>),
}

/// Category of a test case (`<category term=".." value=".."/>`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmCategory {
    pub name: String,
    pub value: String,
}

/// `testcase` resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QmTestCase {
    pub href: String,
    pub title: String,
    /// Numeric id shown in the web UI
    pub web_id: i64,
    pub description: String,
    pub owner: String,
    pub creator: String,
    pub updated: Option<DateTime<FixedOffset>>,
    pub estimate: Option<Duration>,
    pub categories: Vec<QmCategory>,
    pub automatic_test_scripts: Vec<String>,
    pub manual_test_scripts: Vec<String>,
}

impl QmResource for QmTestCase {
    const RESOURCE_ID: &'static str = "testcase";

    fn from_xml(root: &XmlElement) -> Result<Self> {
        Ok(Self {
            href: text(root, "identifier"),
            title: text(root, "title"),
            web_id: int(root, "webId")?,
            description: text(root, "description"),
            owner: text(root, "owner"),
            creator: text(root, "creator"),
            updated: time(root, "updated")?,
            estimate: millis(root, "estimate")?,
            categories: root
                .select("category")
                .into_iter()
                .map(|category| QmCategory {
                    name: category.attr("term").unwrap_or_default().to_string(),
                    value: category.attr("value").unwrap_or_default().to_string(),
                })
                .collect(),
            automatic_test_scripts: hrefs(root, "remotescript"),
            manual_test_scripts: hrefs(root, "testscript"),
        })
    }

    fn href(&self) -> &str {
        &self.href
    }

    fn set_href(&mut self, href: String) {
        self.href = href;
    }
}

impl QmTestCase {
    /// Load the manual test scripts of the test case.
    pub async fn load_manual_test_scripts(
        &self,
        client: &Client,
        project: &QmProject,
    ) -> Fetched<QmTestScript> {
        client
            .qm_get_many(project, self.manual_test_scripts.iter().cloned())
            .await
    }
}

/// `testscript` resource (manual test script)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QmTestScript {
    pub href: String,
    pub title: String,
    pub web_id: i64,
    pub description: String,
    pub owner: String,
    pub creator: String,
    pub updated: Option<DateTime<FixedOffset>>,
}

impl QmResource for QmTestScript {
    const RESOURCE_ID: &'static str = "testscript";

    fn from_xml(root: &XmlElement) -> Result<Self> {
        Ok(Self {
            href: text(root, "identifier"),
            title: text(root, "title"),
            web_id: int(root, "webId")?,
            description: text(root, "description"),
            owner: text(root, "owner"),
            creator: text(root, "creator"),
            updated: time(root, "updated")?,
        })
    }

    fn href(&self) -> &str {
        &self.href
    }

    fn set_href(&mut self, href: String) {
        self.href = href;
    }
}

/// `configuration` resource, called test environment in the web UI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmTestEnvironment {
    pub href: String,
    pub title: String,
    pub summary: String,
}

impl QmResource for QmTestEnvironment {
    const RESOURCE_ID: &'static str = "configuration";

    fn from_xml(root: &XmlElement) -> Result<Self> {
        Ok(Self {
            href: text(root, "identifier"),
            title: text(root, "title"),
            summary: text(root, "summary"),
        })
    }

    fn href(&self) -> &str {
        &self.href
    }

    fn set_href(&mut self, href: String) {
        self.href = href;
    }
}

/// `testplan` resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmTestPlan {
    pub href: String,
    pub title: String,
    pub alias: String,
    pub web_id: i64,
    pub description: String,
    pub test_environments: Vec<String>,
    pub test_cases: Vec<String>,
}

impl QmResource for QmTestPlan {
    const RESOURCE_ID: &'static str = "testplan";

    fn from_xml(root: &XmlElement) -> Result<Self> {
        Ok(Self {
            href: text(root, "identifier"),
            title: text(root, "title"),
            alias: text(root, "alias"),
            web_id: int(root, "webId")?,
            description: text(root, "description"),
            test_environments: hrefs(root, "configuration"),
            test_cases: hrefs(root, "testcase"),
        })
    }

    fn href(&self) -> &str {
        &self.href
    }

    fn set_href(&mut self, href: String) {
        self.href = href;
    }
}

impl QmTestPlan {
    /// Load the test cases of the plan.
    pub async fn load_test_cases(&self, client: &Client, project: &QmProject) -> Fetched<QmTestCase> {
        client
            .qm_get_many(project, self.test_cases.iter().cloned())
            .await
    }

    /// Execution results recorded against the plan.
    pub async fn load_execution_results(
        &self,
        client: &Client,
        project: &QmProject,
    ) -> Fetched<QmTestExecutionResult> {
        let filter = super::QmFilter::new().with("testplan/@href", self.href.as_str());
        client.qm_list(project, &filter).await
    }
}

/// `executionresult` resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QmTestExecutionResult {
    pub href: String,
    pub title: String,
    pub web_id: i64,
    /// e.g. `com.ibm.rqm.execution.common.state.passed`
    pub state: String,
    pub creator: String,
    pub updated: Option<DateTime<FixedOffset>>,
    pub machine: String,
    pub start_time: Option<DateTime<FixedOffset>>,
    pub end_time: Option<DateTime<FixedOffset>>,
    pub variables: BTreeMap<String, String>,
    pub test_case: String,
    pub test_environment: String,
    pub test_execution_record: String,
    pub automatic_test_script: String,
    pub manual_test_script: String,
}

impl QmTestExecutionResult {
    pub const STATE_PASSED: &'static str = "com.ibm.rqm.execution.common.state.passed";
    pub const STATE_FAILED: &'static str = "com.ibm.rqm.execution.common.state.failed";
    pub const STATE_BLOCKED: &'static str = "com.ibm.rqm.execution.common.state.blocked";
    pub const STATE_INCOMPLETE: &'static str = "com.ibm.rqm.execution.common.state.incomplete";
    pub const STATE_ERROR: &'static str = "com.ibm.rqm.execution.common.state.error";

    /// Load the test case the result belongs to.
    pub async fn load_test_case(&self, client: &Client, project: &QmProject) -> Result<QmTestCase> {
        client.qm_get(project, &self.test_case).await
    }
}

impl QmResource for QmTestExecutionResult {
    const RESOURCE_ID: &'static str = "executionresult";

    fn from_xml(root: &XmlElement) -> Result<Self> {
        Ok(Self {
            href: text(root, "identifier"),
            title: text(root, "title"),
            web_id: int(root, "webId")?,
            state: text(root, "state"),
            creator: text(root, "creator"),
            updated: time(root, "updated")?,
            machine: text(root, "machine"),
            start_time: time(root, "starttime")?,
            end_time: time(root, "endtime")?,
            variables: variables(root, "variables"),
            test_case: href(root, "testcase"),
            test_environment: href(root, "configuration"),
            test_execution_record: href(root, "executionworkitem"),
            automatic_test_script: href(root, "remotescript"),
            manual_test_script: href(root, "testscript"),
        })
    }

    fn href(&self) -> &str {
        &self.href
    }

    fn set_href(&mut self, href: String) {
        self.href = href;
    }

    fn save_fields(&self) -> Vec<(&'static str, QmField<'_>)> {
        vec![
            ("qm:webId", QmField::Int(self.web_id)),
            ("alm:state", QmField::Text(&self.state)),
            ("qmresult:machine", QmField::Text(&self.machine)),
            ("qmresult:starttime", QmField::Time(self.start_time.as_ref())),
            ("qmresult:endtime", QmField::Time(self.end_time.as_ref())),
            ("qm:variables", QmField::Variables(&self.variables)),
            ("qm:testcase", QmField::Ref(&self.test_case)),
            ("qm:configuration", QmField::Ref(&self.test_environment)),
            ("qm:executionworkitem", QmField::Ref(&self.test_execution_record)),
            ("qm:remotescript", QmField::Ref(&self.automatic_test_script)),
            ("qm:testscript", QmField::Ref(&self.manual_test_script)),
        ]
    }
}

fn text(root: &XmlElement, name: &str) -> String {
    root.child(name)
        .map(|e| e.text().to_string())
        .unwrap_or_default()
}

fn int(root: &XmlElement, name: &str) -> Result<i64> {
    let value = text(root, name);
    if value.trim().is_empty() {
        return Ok(0);
    }
    value
        .trim()
        .parse()
        .map_err(|e| Error::Parse(format!("field \"{name}\": invalid number \"{value}\": {e}")))
}

fn time(root: &XmlElement, name: &str) -> Result<Option<DateTime<FixedOffset>>> {
    let value = text(root, name);
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(Some)
        .map_err(|e| Error::TimeParse {
            field: name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Durations are sent as milliseconds.
fn millis(root: &XmlElement, name: &str) -> Result<Option<Duration>> {
    let value = text(root, name);
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
        .map(Some)
        .ok_or_else(|| Error::Parse(format!("field \"{name}\": invalid duration \"{value}\"")))
}

fn href(root: &XmlElement, name: &str) -> String {
    root.child(name)
        .and_then(|e| e.attr("href"))
        .unwrap_or_default()
        .to_string()
}

fn hrefs(root: &XmlElement, name: &str) -> Vec<String> {
    root.select(name)
        .into_iter()
        .filter_map(|e| e.attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

fn variables(root: &XmlElement, name: &str) -> BTreeMap<String, String> {
    root.child(name)
        .map(|e| {
            e.select("variable")
                .into_iter()
                .map(|variable| (text(variable, "name"), text(variable, "value")))
                .collect()
        })
        .unwrap_or_default()
}

/// Render the request body used to save a resource.
pub(crate) fn render<T: QmResource>(resource: &T) -> Result<String> {
    let root = format!("qm:{}", T::RESOURCE_ID);
    let mut start = BytesStart::new(root.as_str());
    for attribute in NAMESPACES {
        start.push_attribute(attribute);
    }

    let mut writer = Writer::new(Vec::new());
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write(&mut writer, Event::Start(start))?;
    for (name, field) in resource.save_fields() {
        write_field(&mut writer, name, field)?;
    }
    write(&mut writer, Event::End(BytesEnd::new(root.as_str())))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Parse(format!("rendered XML is not UTF-8: {e}")))
}

fn write_field(writer: &mut Writer<Vec<u8>>, name: &str, field: QmField<'_>) -> Result<()> {
    match field {
        QmField::Text(text) if !text.is_empty() => write_text(writer, name, text),
        QmField::Int(value) if value != 0 => write_text(writer, name, &value.to_string()),
        QmField::Time(Some(time)) => {
            write_text(writer, name, &time.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        QmField::Ref(href) if !href.is_empty() => {
            let mut element = BytesStart::new(name);
            element.push_attribute(("href", href));
            write(writer, Event::Empty(element))
        }
        QmField::Variables(variables) => {
            write(writer, Event::Start(BytesStart::new(name)))?;
            for (key, value) in variables {
                write(writer, Event::Start(BytesStart::new("qm:variable")))?;
                write_text(writer, "qm:name", key)?;
                write_text(writer, "qm:value", value)?;
                write(writer, Event::End(BytesEnd::new("qm:variable")))?;
            }
            write(writer, Event::End(BytesEnd::new(name)))
        }
        _ => Ok(()),
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Parse(format!("failed to render XML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::xml;

    const TEST_CASE: &str = r#"<ns2:testcase xmlns:ns2="http://jazz.net/xmlns/alm/qm/v0.1/"
            xmlns:ns4="http://purl.org/dc/elements/1.1/">
          <ns4:identifier>https://jazz.example.com/qm/service/tc/urn:com.ibm.rqm:testcase:12</ns4:identifier>
          <ns2:webId>12</ns2:webId>
          <ns4:title>Login works</ns4:title>
          <ns4:description>  keeps spaces </ns4:description>
          <ns2:updated>2023-03-01T10:15:00.123Z</ns2:updated>
          <ns2:estimate>90000</ns2:estimate>
          <ns2:category term="Component" value="Auth"/>
          <ns2:testscript href="https://jazz.example.com/qm/ts/1"/>
          <ns2:testscript href="https://jazz.example.com/qm/ts/2"/>
          <ns2:remotescript href=""/>
        </ns2:testcase>"#;

    #[test]
    fn test_decode_test_case() {
        let case = QmTestCase::from_xml(&xml::parse(TEST_CASE).unwrap()).unwrap();
        assert!(case.href.ends_with("testcase:12"));
        assert_eq!(case.web_id, 12);
        assert_eq!(case.title, "Login works");
        assert_eq!(case.description, "  keeps spaces ");
        assert_eq!(case.updated.unwrap().timestamp_subsec_millis(), 123);
        assert_eq!(case.estimate, Some(Duration::from_secs(90)));
        assert_eq!(
            case.categories,
            vec![QmCategory {
                name: "Component".to_string(),
                value: "Auth".to_string()
            }]
        );
        assert_eq!(case.manual_test_scripts.len(), 2);
        assert!(case.automatic_test_scripts.is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_number() {
        let root = xml::parse("<testscript><webId>twelve</webId></testscript>").unwrap();
        let err = QmTestScript::from_xml(&root).unwrap_err();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("webId")));
    }

    #[test]
    fn test_render_execution_result() {
        let mut variables = BTreeMap::new();
        variables.insert("browser".to_string(), "firefox & co".to_string());
        let result = QmTestExecutionResult {
            state: QmTestExecutionResult::STATE_PASSED.to_string(),
            machine: "ci-7".to_string(),
            start_time: DateTime::parse_from_rfc3339("2023-03-01T10:00:00Z").ok(),
            variables,
            test_case: "https://jazz.example.com/qm/tc/12".to_string(),
            ..QmTestExecutionResult::default()
        };

        let body = render(&result).unwrap();
        assert!(body.starts_with("<?xml"));
        assert!(body.contains(r#"<qm:executionresult xmlns:alm="http://jazz.net/xmlns/alm/v0.1/""#));
        assert!(body.contains("<alm:state>com.ibm.rqm.execution.common.state.passed</alm:state>"));
        assert!(body.contains("<qmresult:starttime>2023-03-01T10:00:00Z</qmresult:starttime>"));
        assert!(body.contains("<qm:value>firefox &amp; co</qm:value>"));
        assert!(body.contains(r#"<qm:testcase href="https://jazz.example.com/qm/tc/12"/>"#));
        // zero values are not sent
        assert!(!body.contains("webId"));
        assert!(!body.contains("endtime"));
        assert!(!body.contains("qm:testscript"));

        let decoded = QmTestExecutionResult::from_xml(&xml::parse(&body).unwrap()).unwrap();
        assert_eq!(decoded.state, result.state);
        assert_eq!(decoded.variables, result.variables);
        assert_eq!(decoded.test_case, result.test_case);
        assert_eq!(decoded.start_time, result.start_time);
    }
}
