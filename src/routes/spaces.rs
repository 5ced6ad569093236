use super::UserId;
use crate::error::{AppError, AppResult};
use crate::model::Visibility;
use crate::state::AppState;
use axum::{extract::Path, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `GET /spaces` — spec.md §6: list of visible spaces for the authenticated user.
pub async fn list_spaces(State(state): State<AppState>, UserId(user_id): UserId) -> Json<Vec<crate::model::Space>> {
    Json(state.spaces.list_visible(&user_id))
}

#[derive(Debug, Deserialize)]
pub struct CreateSpaceRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    visibility: Option<Visibility>,
}

/// `POST /spaces` — spec.md §6 body is `{ name, description, visibility }`;
/// the root path is not client-supplied, it's derived under the configured
/// spaces root and created on demand (spec.md §4.1).
pub async fn create_space(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(body): Json<CreateSpaceRequest>,
) -> AppResult<Json<crate::model::Space>> {
    if body.name.trim().is_empty() {
        return Err(AppError::ValidationFailed("name is required".to_string()));
    }
    let root_path = std::path::Path::new(&state.config.spaces_root_dir)
        .join(slugify(&body.name))
        .to_string_lossy()
        .to_string();

    let space = state.spaces.create(
        &user_id,
        body.name,
        body.description,
        body.visibility.unwrap_or(Visibility::Private),
        &root_path,
    )?;
    Ok(Json(space))
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub name: String,
    pub path: String,
    pub folders: Vec<FolderNode>,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[serde(rename = "docKey")]
    pub doc_key: String,
    pub title: String,
    #[serde(rename = "path")]
    pub relative_path: String,
    #[serde(rename = "fileType")]
    pub file_type: crate::model::FileType,
}

/// `GET /spaces/:id/folders` — spec.md §6: a hierarchical tree built from
/// the current index generation rather than a fresh filesystem walk.
pub async fn folders(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<u64>,
) -> AppResult<Json<FolderNode>> {
    let space = state.spaces.get_by_id(id)?;
    if !space.visible_to(&user_id) {
        return Err(AppError::PermissionDenied("space is not visible to this user".to_string()));
    }

    let generation = state.index.current();
    let mut root = FolderNode { name: space.name.clone(), path: String::new(), folders: Vec::new(), documents: Vec::new() };

    for entry in generation.documents.iter() {
        let doc = entry.value();
        if doc.space_id != id {
            continue;
        }
        insert_into_tree(&mut root, &doc.relative_path, doc);
    }

    sort_tree(&mut root);
    Ok(Json(root))
}

fn insert_into_tree(root: &mut FolderNode, relative_path: &str, doc: &crate::model::IndexedDocument) {
    let parts: Vec<&str> = relative_path.split('/').collect();
    let mut current = root;
    let mut path_so_far = String::new();

    for segment in &parts[..parts.len().saturating_sub(1)] {
        if !path_so_far.is_empty() {
            path_so_far.push('/');
        }
        path_so_far.push_str(segment);

        let idx = current.folders.iter().position(|f| f.name == *segment);
        let idx = match idx {
            Some(idx) => idx,
            None => {
                current.folders.push(FolderNode {
                    name: segment.to_string(),
                    path: path_so_far.clone(),
                    folders: Vec::new(),
                    documents: Vec::new(),
                });
                current.folders.len() - 1
            }
        };
        current = &mut current.folders[idx];
    }

    current.documents.push(DocumentSummary {
        doc_key: doc.doc_key.clone(),
        title: doc.title.clone(),
        relative_path: doc.relative_path.clone(),
        file_type: doc.file_type,
    });
}

fn sort_tree(node: &mut FolderNode) {
    node.folders.sort_by(|a, b| a.name.cmp(&b.name));
    node.documents.sort_by(|a, b| a.title.cmp(&b.title));
    for child in &mut node.folders {
        sort_tree(child);
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateFile {
    pub name: String,
    pub content: String,
}

/// `GET /spaces/:id/templates` — spec.md §6: creates `.templates/sample.md`
/// if the folder doesn't exist yet.
pub async fn templates(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<u64>,
) -> AppResult<Json<Vec<TemplateFile>>> {
    let space = state.spaces.get_by_id(id)?;
    if !space.visible_to(&user_id) {
        return Err(AppError::PermissionDenied("space is not visible to this user".to_string()));
    }

    let templates_dir = std::path::Path::new(&space.root_path).join(".templates");
    tokio::fs::create_dir_all(&templates_dir).await.map_err(AppError::Io)?;

    let sample_path = templates_dir.join("sample.md");
    if tokio::fs::metadata(&sample_path).await.is_err() {
        tokio::fs::write(&sample_path, "---\ntags: template\n---\n# Sample\n\nReplace this with your content.\n")
            .await
            .map_err(AppError::Io)?;
    }

    let mut files = BTreeMap::new();
    let mut entries = tokio::fs::read_dir(&templates_dir).await.map_err(AppError::Io)?;
    while let Some(entry) = entries.next_entry().await.map_err(AppError::Io)? {
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let content = tokio::fs::read_to_string(entry.path()).await.unwrap_or_default();
        files.insert(name.clone(), TemplateFile { name, content });
    }

    Ok(Json(files.into_values().collect()))
}
