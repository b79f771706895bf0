use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{FirebaseEndpoints, ProbeKind, ProbeReport};
use crate::errors::ProbeError;

const TEST_DOC_PATH: &str = "test/testDoc";
const TEST_OBJECT: &str = "test/test.txt";
const TEST_OBJECT_BODY: &str = "Hello Storage!";

/// Runs probes against one set of Firebase endpoints.
#[derive(Debug, Clone)]
pub struct FirebaseProbe {
    client: reqwest::Client,
    endpoints: FirebaseEndpoints,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "downloadTokens", default)]
    download_tokens: Option<String>,
}

impl FirebaseProbe {
    pub fn new(endpoints: FirebaseEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Run one probe and fold the result into a report.
    pub async fn run(&self, kind: ProbeKind) -> ProbeReport {
        let outcome = match kind {
            ProbeKind::Auth => self.auth().await,
            ProbeKind::Firestore => self.firestore().await,
            ProbeKind::Storage => self.storage().await,
            ProbeKind::Functions => self.functions().await,
        };
        if let Err(e) = &outcome {
            tracing::debug!(probe = %kind, error = %e, "probe failed");
        }
        ProbeReport {
            kind,
            outcome: outcome.map_err(|e| e.to_string()),
        }
    }

    /// Anonymous sign-up.
    pub async fn auth(&self) -> Result<String, ProbeError> {
        let base = require(&self.endpoints.auth, "Auth")?;
        let resp = self
            .client
            .post(format!("{}/v1/accounts:signUp", base))
            .query(&[("key", self.endpoints.api_key.as_str())])
            .json(&json!({ "returnSecureToken": true }))
            .send()
            .await?;
        let body: Value = check("Auth", resp).await?.json().await?;
        if body.get("idToken").is_none() {
            return Err(ProbeError::UnexpectedResponse("no idToken in sign-up reply".into()));
        }
        Ok("Signed in anonymously".to_string())
    }

    /// Write `test/testDoc`, read it back, report its fields.
    pub async fn firestore(&self) -> Result<String, ProbeError> {
        let base = require(&self.endpoints.firestore, "Firestore")?;
        let url = format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            base, self.endpoints.project_id, TEST_DOC_PATH
        );
        let doc = json!({
            "fields": {
                "hello": { "stringValue": "world" },
                "ts": { "integerValue": chrono::Utc::now().timestamp_millis().to_string() },
            }
        });

        let write = self.authorize(self.client.patch(&url)).json(&doc).send().await?;
        check("Firestore", write).await?;

        let read = self.authorize(self.client.get(&url)).send().await?;
        let snapshot: Value = check("Firestore", read).await?.json().await?;
        let fields = snapshot
            .get("fields")
            .ok_or_else(|| ProbeError::UnexpectedResponse("document has no fields".into()))?;
        Ok(decode_fields(fields).to_string())
    }

    /// Upload a small text object and report its download URL.
    pub async fn storage(&self) -> Result<String, ProbeError> {
        let base = require(&self.endpoints.storage, "Storage")?;
        let resp = self
            .authorize(
                self.client
                    .post(format!("{}/v0/b/{}/o", base, self.endpoints.bucket)),
            )
            .query(&[("name", TEST_OBJECT)])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(TEST_OBJECT_BODY)
            .send()
            .await?;
        let uploaded: UploadResponse = check("Storage", resp).await?.json().await?;
        let token = uploaded
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProbeError::UnexpectedResponse("no download token".into()))?;

        let url = download_url(base, &self.endpoints.bucket, TEST_OBJECT, token)?;
        Ok(format!("File uploaded. URL: {}", url))
    }

    /// Invoke the configured callable with no data.
    pub async fn functions(&self) -> Result<String, ProbeError> {
        let base = require(&self.endpoints.functions, "Functions")?;
        let url = format!(
            "{}/{}/{}/{}",
            base, self.endpoints.project_id, self.endpoints.region, self.endpoints.function
        );
        let resp = self
            .client
            .post(url)
            .json(&json!({ "data": null }))
            .send()
            .await?;
        let body: Value = check("Functions", resp).await?.json().await?;
        let result = body
            .get("result")
            .ok_or_else(|| ProbeError::UnexpectedResponse("callable returned no result".into()))?;
        Ok(result.to_string())
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.endpoints.emulator {
            req.bearer_auth("owner")
        } else {
            req
        }
    }
}

fn require<'a>(url: &'a Option<String>, service: &'static str) -> Result<&'a str, ProbeError> {
    url.as_deref().ok_or(ProbeError::NotConfigured { service })
}

/// Turn non-2xx replies into `ProbeError::Rejected`, preferring the Google
/// API `error.message` field when present.
async fn check(service: &'static str, resp: Response) -> Result<Response, ProbeError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or(text);
    Err(ProbeError::Rejected {
        service,
        status: status.as_u16(),
        message,
    })
}

fn download_url(base: &str, bucket: &str, object: &str, token: &str) -> Result<Url, ProbeError> {
    let mut url = Url::parse(&format!("{}/v0/b/{}/o", base, bucket))
        .map_err(|e| ProbeError::UnexpectedResponse(format!("bad storage URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| ProbeError::UnexpectedResponse("storage URL cannot take a path".into()))?
        .push(object);
    url.query_pairs_mut()
        .append_pair("alt", "media")
        .append_pair("token", token);
    Ok(url)
}

/// Convert Firestore typed fields (`{"x": {"stringValue": "y"}}`) to plain JSON.
fn decode_fields(fields: &Value) -> Value {
    match fields.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect::<Map<_, _>>(),
        ),
        None => fields.clone(),
    }
}

fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "nullValue" => Value::Null,
        "mapValue" => inner
            .get("fields")
            .map(decode_fields)
            .unwrap_or_else(|| json!({})),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        _ => inner.clone(),
    }
}
