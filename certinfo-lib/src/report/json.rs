use super::Renderer;
use crate::scan::ScanResult;
use crate::CertinfoError;

/// Pretty-printed JSON of every [`ScanResult`] field.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, result: &ScanResult) -> Result<String, CertinfoError> {
        serde_json::to_string_pretty(result).map_err(CertinfoError::Json)
    }
}
