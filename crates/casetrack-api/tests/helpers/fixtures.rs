use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};

/// A complete case body with every mandatory field.
pub fn case_body(code: i64, title: &str) -> Value {
    json!({
        "code": code,
        "title": title,
        "crimeType": "Robo",
        "date": "2024-01-01",
        "hour": "10:00",
        "status": "Open",
        "latitude": 4.711,
        "longitude": -74.0721,
        "place": "Calle 10 #4-21"
    })
}

/// Create a case and return the response body.
pub async fn create_case(client: &TestServer, code: i64, title: &str) -> Value {
    let response = client.post("/api/cases").json(&case_body(code, title)).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// JPEG start-of-image marker followed by filler bytes.
pub fn jpeg_bytes() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend_from_slice(b"casetrack test image");
    data
}

pub fn image_part(name: &str) -> Part {
    Part::bytes(jpeg_bytes())
        .file_name(name.to_string())
        .mime_type("image/jpeg")
}

pub fn single_image_form(name: &str) -> MultipartForm {
    MultipartForm::new().add_part("images", image_part(name))
}
