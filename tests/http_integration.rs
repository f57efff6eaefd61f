//! Integration tests for the HTTP transport using wiremock
//!
//! These tests verify request rendering, both login schemes and the
//! handling of error responses against mocked endpoints.

use jazz_client::{Client, ClientConfig, Error, Filter};
use tokio_test::assert_ok;
use wiremock::matchers::{
    basic_auth, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTRIBUTOR_FIELDS: &str = "contributor/contributor[itemId=_c1]/(modifiedBy/itemId|*)";

const CONTRIBUTOR_XML: &str = "<foundation><contributor>\
    <itemId>_c1</itemId><name>Jane Doe</name><userId>jdoe</userId>\
    <modifiedBy><itemId>_admin</itemId></modifiedBy>\
    </contributor></foundation>";

fn client(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(server.uri(), "jdoe"), "secret").expect("valid config")
}

fn xml(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/xml")
}

mod request_tests {
    use super::*;

    /// Test the projection is sent as the `fields` query parameter
    #[tokio::test]
    async fn test_get_sends_projection_and_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ccm/rpt/repository/foundation"))
            .and(query_param("fields", CONTRIBUTOR_FIELDS))
            .and(header("accept", "application/xml"))
            .and(header("oslc-core-version", "2.0"))
            .respond_with(xml(CONTRIBUTOR_XML))
            .expect(1)
            .mount(&server)
            .await;

        let object = client(&server).get("Contributor", "_c1").await.unwrap();
        assert_eq!(object.str("name"), Some("Jane Doe"));
        assert_eq!(
            object.reference("modifiedBy").map(|r| r.identifier()),
            Some("_admin")
        );
    }

    /// Test the configuration context header is sent when configured
    #[tokio::test]
    async fn test_configuration_context_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("configuration-context", "https://jazz/gc/configuration/1"))
            .respond_with(xml(CONTRIBUTOR_XML))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig {
            configuration_context: Some("https://jazz/gc/configuration/1".to_string()),
            ..ClientConfig::new(server.uri(), "jdoe")
        };
        let client = Client::new(config, "secret").unwrap();
        assert_ok!(client.get("Contributor", "_c1").await);
    }

    /// Test the project feed is requested without a configuration context
    #[tokio::test]
    async fn test_project_feed_without_configuration_context() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(
                "/qm/service/com.ibm.rqm.integration.service.IIntegrationService/projects",
            ))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"feed": {"entry": {"id": "p1", "title": {"content": "Demo"},
                    "content": {"project": {"alias": {"content": "Demo"}}}}}}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig {
            configuration_context: Some("https://jazz/gc/configuration/1".to_string()),
            ..ClientConfig::new(server.uri(), "jdoe")
        };
        let projects = Client::new(config, "secret")
            .unwrap()
            .qm_projects()
            .await
            .unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].alias, "Demo");

        let requests = server.received_requests().await.unwrap();
        assert!(requests
            .iter()
            .all(|r| !r.headers.contains_key("configuration-context")));
    }

    /// Test a listing followed by the item fetches
    #[tokio::test]
    async fn test_list_then_fetch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param(
                "fields",
                r#"contributor/contributor[userId="jdoe"]/(itemId)"#,
            ))
            .and(query_param("size", "100"))
            .respond_with(xml(
                "<foundation><contributor><itemId>_c1</itemId></contributor></foundation>",
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("fields", CONTRIBUTOR_FIELDS))
            .respond_with(xml(CONTRIBUTOR_XML))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server)
            .list("Contributor", &Filter::new().with("userId", "jdoe"))
            .await
            .into_result()
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_id(), "_c1");
    }

    /// Test saving sends the rendered XML body
    #[tokio::test]
    async fn test_save_puts_xml() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(xml(CONTRIBUTOR_XML))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/resource/itemOid/com.ibm.team.repository.Contributor/_c1"))
            .and(header("content-type", "application/xml"))
            .and(body_string_contains("<name>Jane Doe</name>"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let object = client.get("Contributor", "_c1").await.unwrap();
        client
            .save("resource/itemOid/com.ibm.team.repository.Contributor/_c1", &object)
            .await
            .unwrap();
    }
}

mod auth_tests {
    use super::*;

    /// Test the form challenge triggers a login and a retry
    #[tokio::test]
    async fn test_form_challenge_login() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ccm/rpt/repository/foundation"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-com-ibm-team-repository-web-auth-msg", "authrequired"),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jts/j_security_check"))
            .and(query_param("j_username", "jdoe"))
            .and(query_param("j_password", "secret"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "JSESSIONID=abc; Path=/"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ccm/rpt/repository/foundation"))
            .respond_with(xml(CONTRIBUTOR_XML))
            .expect(1)
            .mount(&server)
            .await;

        let object = client(&server).get("Contributor", "_c1").await.unwrap();
        assert_eq!(object.item_id(), "_c1");
    }

    /// Test a failed form login is reported
    #[tokio::test]
    async fn test_form_login_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ccm/rpt/repository/foundation"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-com-ibm-team-repository-web-auth-msg", "authrequired"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jts/j_security_check"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-com-ibm-team-repository-web-auth-msg", "authfailed"),
            )
            .mount(&server)
            .await;

        let err = client(&server).get("Contributor", "_c1").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("authentication failed"));
    }

    /// Test a basic auth challenge is answered with credentials
    #[tokio::test]
    async fn test_basic_auth_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(basic_auth("jdoe", "secret"))
            .respond_with(xml(CONTRIBUTOR_XML))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401).insert_header("www-authenticate", "Basic realm=\"jazz\""),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        assert_ok!(client.get("Contributor", "_c1").await);
        // credentials are sent upfront from now on
        assert_ok!(client.get("Contributor", "_c1").await);
    }

    /// Test 401 without any challenge
    #[tokio::test]
    async fn test_unknown_auth_method() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).get("Contributor", "_c1").await.unwrap_err();
        assert!(err.to_string().contains("unknown auth method"));
    }
}

mod error_tests {
    use super::*;

    /// Test 404 with an XML error document carries its message
    #[tokio::test]
    async fn test_404_with_error_document() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_raw(
                "<error><message>CRJZS5742E Unknown resource</message></error>",
                "application/xml",
            ))
            .mount(&server)
            .await;

        match client(&server).get("Contributor", "_c1").await {
            Err(Error::Status { status, message }) => {
                assert_eq!(status, 404);
                assert!(message.contains("Unknown resource"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    /// Test 500 with an HTML page falls back to a generic message
    #[tokio::test]
    async fn test_500_with_html_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_raw("<html><body><h1>Oops</h1><br></body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        match client(&server).get("Contributor", "_c1").await {
            Err(Error::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "unknown error");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    /// Test an empty body for an item
    #[tokio::test]
    async fn test_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client(&server).get("Contributor", "_c1").await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse(_)));
    }

    /// Test a connection failure surfaces as a transport error
    #[tokio::test]
    async fn test_connection_refused() {
        // reserve a free port and release it so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let uri = format!("http://{address}/");
        let client = Client::new(ClientConfig::new(uri, "jdoe"), "secret").unwrap();
        let err = client.get("Contributor", "_c1").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
