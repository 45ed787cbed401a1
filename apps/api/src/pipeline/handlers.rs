use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::info;

use crate::document::{self, ExtractedText, ExtractionError, ResumeDocument};
use crate::errors::AppError;
use crate::pipeline::AnalysisReport;
use crate::state::AppState;

/// Fields of an analysis upload. Unknown fields are ignored.
#[derive(Default)]
struct UploadForm {
    resume: Option<ResumeDocument>,
    prompt: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("resume") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                form.resume = Some(ResumeDocument::new(file_name, bytes));
            }
            Some("prompt") => form.prompt = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

fn require_resume(form: &mut UploadForm) -> Result<ResumeDocument, AppError> {
    form.resume
        .take()
        .ok_or_else(|| AppError::Validation("a 'resume' PDF file is required".to_string()))
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError> {
    let mut form = read_form(multipart).await?;
    let resume = require_resume(&mut form)?;
    let prompt = form
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("a non-empty 'prompt' is required".to_string()))?;

    info!(
        "Analyzing {} ({} bytes)",
        resume.file_name.as_deref().unwrap_or("<unnamed>"),
        resume.bytes.len()
    );
    let report = state.coordinator.analyze_document(&resume, &prompt).await?;
    Ok(Json(report))
}

/// POST /api/v1/resume/extract
pub async fn handle_extract(multipart: Multipart) -> Result<Json<ExtractedText>, AppError> {
    let mut form = read_form(multipart).await?;
    let resume = require_resume(&mut form)?;
    let text = document::extract_text(&resume).await?;
    if text.trim().is_empty() {
        return Err(ExtractionError::NoText.into());
    }
    Ok(Json(ExtractedText::new(text)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::document::single_page_pdf;
    use crate::routes::build_router;
    use crate::test_support::{app_state, multipart_form, FixedModel};

    const STUB: &str = "1. **Data Analyst** - SQL reporting\n2. **Python Developer**";

    async fn post_form(
        app: Router,
        uri: &str,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> (StatusCode, Value) {
        let (content_type, body) = multipart_form(parts);
        let response = app
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_returns_report() {
        let model = Arc::new(FixedModel::new(STUB));
        let app = build_router(app_state(model.clone(), &[]));
        let pdf = single_page_pdf("Skills: Python, SQL");

        let (status, body) = post_form(
            app,
            "/api/v1/analyze",
            &[
                ("resume", Some("resume.pdf"), pdf.as_slice()),
                ("prompt", None, b"Suggest job roles".as_slice()),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["markdown"].as_str().unwrap().contains(STUB));
        assert_eq!(body["job_titles"][0], "Data Analyst");
        assert_eq!(body["stages"][0]["stage"], "skills");
        assert_eq!(body["states"].as_array().unwrap().last().unwrap()["state"], "done");
        assert_eq!(model.calls(), 5);
    }

    #[tokio::test]
    async fn test_analyze_requires_resume_and_prompt() {
        let model = Arc::new(FixedModel::new(STUB));
        let pdf = single_page_pdf("Skills: Python, SQL");

        let app = build_router(app_state(model.clone(), &[]));
        let (status, body) = post_form(
            app,
            "/api/v1/analyze",
            &[("prompt", None, b"Suggest job roles".as_slice())],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let app = build_router(app_state(model.clone(), &[]));
        let (status, body) = post_form(
            app,
            "/api/v1/analyze",
            &[
                ("resume", Some("resume.pdf"), pdf.as_slice()),
                ("prompt", None, b"   ".as_slice()),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("prompt"));

        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_pdf_without_model_calls() {
        let model = Arc::new(FixedModel::new(STUB));
        let app = build_router(app_state(model.clone(), &[]));

        let (status, body) = post_form(
            app,
            "/api/v1/analyze",
            &[
                ("resume", Some("resume.pdf"), b"plain text, not a pdf".as_slice()),
                ("prompt", None, b"Suggest job roles".as_slice()),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "EXTRACTION_ERROR");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let model = Arc::new(FixedModel::new(STUB));
        let app = build_router(app_state(model.clone(), &[("MAX_UPLOAD_BYTES", "256")]));
        let big = vec![b'x'; 4096];

        let (content_type, body) = multipart_form(&[
            ("resume", Some("resume.pdf"), big.as_slice()),
            ("prompt", None, b"Suggest job roles".as_slice()),
        ]);
        let response = app
            .oneshot(
                Request::post("/api/v1/analyze")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_extract_returns_text_and_preview() {
        let model = Arc::new(FixedModel::new(STUB));
        let app = build_router(app_state(model.clone(), &[]));
        let pdf = single_page_pdf("Skills: Python, SQL");

        let (status, body) = post_form(
            app,
            "/api/v1/resume/extract",
            &[("resume", Some("cv.pdf"), pdf.as_slice())],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["text"].as_str().unwrap().contains("Python"));
        assert!(body["preview"].as_str().unwrap().contains("SQL"));
        assert!(body["chars"].as_u64().unwrap() > 0);
        assert_eq!(model.calls(), 0);
    }
}
