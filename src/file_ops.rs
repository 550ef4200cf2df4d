//! Async file picking and import classification.
//!
//! Uses channel-based communication to bridge async file dialogs
//! with egui's synchronous update loop.

use crate::geo::Crs;
use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};

/// A file returned by the picker.
#[derive(Clone)]
pub struct PickedFile {
    pub file_name: String,
    pub file_data: Vec<u8>,
}

/// What a picked set of files contains.
#[derive(Debug)]
pub enum ImportRequest<'a> {
    /// GeoJSON or JSON text: routes or boundaries, decided by content
    Json { name: &'a str, text: String },
    /// Shapefile parts (.shp with optional .dbf) and the CRS read from .prj
    Shapefile {
        name: &'a str,
        shp: &'a [u8],
        dbf: Option<&'a [u8]>,
        crs: Crs,
    },
}

/// Channel-based file picker for async file dialog integration.
///
/// File dialogs are async but egui's update() is synchronous.
/// This struct provides a channel to pass results from the async
/// file picker task back to the UI thread.
pub struct FilePickerChannel {
    sender: Sender<Option<Vec<PickedFile>>>,
    receiver: Receiver<Option<Vec<PickedFile>>>,
}

impl Default for FilePickerChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl FilePickerChannel {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { sender, receiver }
    }

    /// Spawns an async file picker dialog allowing several files, so a
    /// shapefile can be picked together with its .dbf and .prj.
    ///
    /// On native: spawns a new thread using pollster to block on the async dialog.
    /// On WASM: uses wasm_bindgen_futures::spawn_local.
    pub fn pick_files(&self, ctx: egui::Context) {
        let sender = self.sender.clone();

        #[cfg(not(target_arch = "wasm32"))]
        {
            std::thread::spawn(move || {
                let result = pollster::block_on(async_pick_files());
                let _ = sender.send(result);
                ctx.request_repaint();
            });
        }

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(async move {
                let result = async_pick_files().await;
                let _ = sender.send(result);
                ctx.request_repaint();
            });
        }
    }

    /// Non-blocking check for a completed file pick.
    ///
    /// Returns Some(Some(files)) if files were picked,
    /// Some(None) if the dialog was cancelled,
    /// None if no result is ready yet.
    pub fn try_recv(&self) -> Option<Option<Vec<PickedFile>>> {
        self.receiver.try_recv().ok()
    }
}

async fn async_pick_files() -> Option<Vec<PickedFile>> {
    let handles = rfd::AsyncFileDialog::new()
        .set_title("Import routes or boundaries")
        .add_filter("Map data", &["geojson", "json", "shp", "dbf", "prj"])
        .pick_files()
        .await?;

    let mut files = Vec::with_capacity(handles.len());
    for handle in handles {
        files.push(PickedFile {
            file_name: handle.file_name(),
            file_data: handle.read().await,
        });
    }
    Some(files)
}

fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Reads the CRS from the WKT in a .prj file.
///
/// Returns `None` for projected systems other than Statistics Canada Lambert.
pub fn crs_from_prj(wkt: &str) -> Option<Crs> {
    let lower = wkt.to_ascii_lowercase();
    if lower.contains("statistics_canada_lambert")
        || (lower.contains("lambert_conformal_conic") && lower.contains("-91.866666"))
    {
        Some(Crs::StatCanLambert)
    } else if lower.trim_start().starts_with("geogcs") {
        // Geographic lon/lat
        Some(Crs::Wgs84)
    } else {
        None
    }
}

/// Decides how to import a set of picked files.
///
/// `crs_override` applies to shapefiles without a .prj.
pub fn classify_files(
    files: &[PickedFile],
    crs_override: Option<Crs>,
) -> Result<ImportRequest<'_>, String> {
    let find = |ext: &str| files.iter().find(|f| extension(&f.file_name) == ext);

    if let Some(shp) = find("shp") {
        let crs = match find("prj") {
            Some(prj) => {
                let wkt = String::from_utf8_lossy(&prj.file_data);
                crs_from_prj(&wkt).ok_or_else(|| {
                    format!(
                        "{}: unsupported coordinate system (use WGS84 or EPSG:3347)",
                        prj.file_name
                    )
                })?
            }
            None => crs_override.unwrap_or(Crs::Wgs84),
        };
        return Ok(ImportRequest::Shapefile {
            name: &shp.file_name,
            shp: &shp.file_data,
            dbf: find("dbf").map(|f| f.file_data.as_slice()),
            crs,
        });
    }

    let json = find("geojson")
        .or_else(|| find("json"))
        .ok_or_else(|| "Pick a .geojson, .json or .shp file".to_string())?;
    let text = String::from_utf8(json.file_data.clone())
        .map_err(|_| format!("{} is not valid UTF-8", json.file_name))?;

    Ok(ImportRequest::Json {
        name: &json.file_name,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, data: &[u8]) -> PickedFile {
        PickedFile {
            file_name: name.to_string(),
            file_data: data.to_vec(),
        }
    }

    #[test]
    fn test_crs_from_prj() {
        let statcan = r#"PROJCS["NAD_1983_Statistics_Canada_Lambert",GEOGCS["GCS_North_American_1983"],PROJECTION["Lambert_Conformal_Conic"]]"#;
        assert_eq!(crs_from_prj(statcan), Some(Crs::StatCanLambert));
        let wgs = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984"]]"#;
        assert_eq!(crs_from_prj(wgs), Some(Crs::Wgs84));
        let mercator = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984"],PROJECTION["Mercator_Auxiliary_Sphere"]]"#;
        assert_eq!(crs_from_prj(mercator), None);
    }

    #[test]
    fn test_classify_rejects_unsupported_prj() {
        let files = vec![
            file("roads.shp", b"shp"),
            file("roads.prj", b"PROJCS[\"WGS_84_Pseudo_Mercator\",PROJECTION[\"Mercator_1SP\"]]"),
        ];
        let err = classify_files(&files, Some(Crs::StatCanLambert)).unwrap_err();
        assert!(err.contains("roads.prj"), "{err}");
    }

    #[test]
    fn test_classify_shapefile_set() {
        let files = vec![
            file("lcsd000b21a_e.DBF", b"dbf"),
            file("lcsd000b21a_e.shp", b"shp"),
            file("lcsd000b21a_e.prj", b"PROJCS[\"NAD_1983_Statistics_Canada_Lambert\"]"),
        ];
        match classify_files(&files, None).unwrap() {
            ImportRequest::Shapefile {
                name,
                shp,
                dbf,
                crs,
            } => {
                assert_eq!(name, "lcsd000b21a_e.shp");
                assert_eq!(shp, b"shp");
                assert_eq!(dbf, Some(&b"dbf"[..]));
                assert_eq!(crs, Crs::StatCanLambert);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_shapefile_without_prj_uses_override() {
        let files = vec![file("a.shp", b"shp")];
        let request = classify_files(&files, Some(Crs::StatCanLambert)).unwrap();
        assert!(matches!(
            request,
            ImportRequest::Shapefile {
                crs: Crs::StatCanLambert,
                dbf: None,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_json() {
        let files = vec![file("routes.json", b"[]")];
        assert!(matches!(
            classify_files(&files, None).unwrap(),
            ImportRequest::Json { text, .. } if text == "[]"
        ));

        let files = vec![file("notes.txt", b"hello")];
        assert!(classify_files(&files, None).is_err());
    }
}
