//! Object-storage key conventions shared by every pipeline stage.
//!
//! The request builder and the inference service agree on the document key
//! only through these functions; so do the inference service and the
//! response parser.
//!
//! - source image:       `{input_prefix}/{image_name}`
//! - request document:   `{input_prefix}/{basename}.json`
//! - response document:  `{output_prefix}/{basename}.json`
//! - generated image:    `{output_prefix}/{image_name}`
//! - status report:      `{status_prefix}/status_report_{id}.json`

/// File name up to (not including) the first `.`.
///
/// ```
/// use outpaint_core::keys::image_basename;
///
/// assert_eq!(image_basename("a.png"), "a");
/// assert_eq!(image_basename("holiday.v2.jpg"), "holiday");
/// assert_eq!(image_basename("noext"), "noext");
/// ```
pub fn image_basename(image_name: &str) -> &str {
    image_name.split('.').next().unwrap_or(image_name)
}

/// Key of the document that carries an image through inference.
pub fn document_key(prefix: &str, image_name: &str) -> String {
    format!("{prefix}/{}.json", image_basename(image_name))
}

/// Key of an image file stored under `prefix` with its original name.
pub fn image_key(prefix: &str, image_name: &str) -> String {
    format!("{prefix}/{image_name}")
}

/// Key of the status report for job `id`.
pub fn status_report_key(prefix: &str, id: &str) -> String {
    format!("{prefix}/status_report_{id}.json")
}
