//! Robot, robot PDF and chat endpoints.

use reqwest::Method;
use reqwest::multipart::{Form, Part};

use super::client::ApiClient;
use super::endpoints::{self, PdfListFilter};
use super::error::ApiResult;
use super::models::{
    ChatReply, ChatRequest, PdfUpdate, PdfUpload, Robot, RobotMessages, RobotPdf,
};

impl ApiClient {
    /// All robots.
    pub async fn list_robots(&self) -> ApiResult<Vec<Robot>> {
        self.get_json(endpoints::ROBOTS, &[]).await
    }

    /// One robot by id.
    pub async fn robot(&self, id: u64) -> ApiResult<Robot> {
        self.get_json(&endpoints::robot(id), &[]).await
    }

    /// One robot by slug.
    pub async fn robot_by_slug(&self, slug: &str) -> ApiResult<Robot> {
        self.get_json(&endpoints::robot_by_slug(slug), &[]).await
    }

    /// All PDFs of a robot.
    pub async fn robot_pdfs(&self, robot_id: u64) -> ApiResult<Vec<RobotPdf>> {
        self.get_json(&endpoints::robot_pdfs(robot_id), &[]).await
    }

    /// Active PDFs of a robot.
    pub async fn robot_active_pdfs(&self, robot_id: u64) -> ApiResult<Vec<RobotPdf>> {
        self.get_json(&endpoints::robot_active_pdfs(robot_id), &[])
            .await
    }

    /// Custom opening messages of a robot.
    pub async fn robot_messages(&self, robot_id: u64) -> ApiResult<RobotMessages> {
        self.get_json(&endpoints::robot_messages(robot_id), &[])
            .await
    }

    /// Replace a robot's opening messages.
    pub async fn update_robot_messages(
        &self,
        robot_id: u64,
        messages: Vec<String>,
    ) -> ApiResult<RobotMessages> {
        self.send_json(
            Method::PUT,
            &endpoints::robot_messages(robot_id),
            &RobotMessages { messages },
        )
        .await
    }

    /// PDFs matching `filter`.
    pub async fn list_pdfs(&self, filter: PdfListFilter) -> ApiResult<Vec<RobotPdf>> {
        self.get_json(endpoints::ROBOT_PDFS, &filter.query_pairs())
            .await
    }

    /// Upload a PDF.
    pub async fn upload_pdf(&self, upload: PdfUpload) -> ApiResult<RobotPdf> {
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/pdf")?;
        let mut form = Form::new()
            .text("robot", upload.robot_id.to_string())
            .text("pdf_type", upload.pdf_type.as_str())
            .part("pdf_dosyasi", part);
        if let Some(description) = upload.description {
            form = form.text("aciklama", description);
        }
        self.send_multipart(Method::POST, endpoints::ROBOT_PDFS, form)
            .await
    }

    /// Update a PDF's metadata.
    pub async fn update_pdf(&self, id: u64, update: &PdfUpdate) -> ApiResult<RobotPdf> {
        self.send_json(Method::PUT, &endpoints::robot_pdf(id), update)
            .await
    }

    /// Delete a PDF.
    pub async fn delete_pdf(&self, id: u64) -> ApiResult<()> {
        self.send_empty(Method::DELETE, &endpoints::robot_pdf(id))
            .await
    }

    /// Flip a PDF's active flag.
    pub async fn toggle_pdf_active(&self, id: u64) -> ApiResult<RobotPdf> {
        self.send_empty(Method::POST, &endpoints::robot_pdf_toggle_active(id))
            .await
    }

    /// Robot info served by the chat endpoint.
    pub async fn robot_info(&self, slug: &str) -> ApiResult<Robot> {
        self.get_fresh(&endpoints::chat(slug)).await
    }

    /// Send one chat message.
    pub async fn send_chat(&self, slug: &str, request: &ChatRequest) -> ApiResult<ChatReply> {
        self.send_json(Method::POST, &endpoints::chat(slug), request)
            .await
    }
}
