//! Command handlers: one per subcommand, all returning `CliResult`.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::services::{DraftStore, UploadReport};
use crate::application::ApplicationError;
use crate::cli::args::{
    AssetSource, Cli, Commands, ConfigCommands, DraftCommands, EditCommand, EquipmentCommands,
};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::editor;
use crate::domain::{
    build, node_at, validate_submission, AssetRef, ButtonDescriptor, DescriptionField, Edit,
    EditSession, ModelNode, NodeField, NodePath, Origin, PendingAsset,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".into()));
    };
    if let Commands::Completion { shell } = command {
        completion(*shell);
        return Ok(());
    }

    let settings = load_settings(cli)?;
    match command {
        Commands::Equipment { command } => equipment_command(&container(settings)?, command),
        Commands::Draft { command } => draft_command(&container(settings)?, command),
        Commands::Config { command } => config_command(&settings, command),
        Commands::Completion { .. } => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        settings.api_base_url = url.clone();
    }
    debug!(
        api = %settings.api_base_url,
        drafts = %settings.draft_dir.display(),
        "settings loaded"
    );
    Ok(settings)
}

fn container(settings: Settings) -> CliResult<ServiceContainer> {
    Ok(ServiceContainer::new(settings)?)
}

fn completion(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}

// ============================================================
// equipment
// ============================================================

#[instrument(skip(container))]
fn equipment_command(container: &ServiceContainer, command: &EquipmentCommands) -> CliResult<()> {
    match command {
        EquipmentCommands::List => {
            let equipments = container.equipment().list()?;
            if equipments.is_empty() {
                output::info("No equipments");
                return Ok(());
            }
            output::header(&format!("{:<20} {:<30} {}", "TAG", "NAME", "CREATED"));
            for eq in equipments {
                let created = eq
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                output::info(&format!("{:<20} {:<30} {}", eq.tag, eq.name, created));
            }
        }
        EquipmentCommands::Show { tag } => {
            let session = container.equipment().open(tag, tag)?;
            output::info(&session_tree(&session));
        }
    }
    Ok(())
}

// ============================================================
// draft
// ============================================================

#[instrument(skip(container))]
fn draft_command(container: &ServiceContainer, command: &DraftCommands) -> CliResult<()> {
    let drafts = container.drafts();
    match command {
        DraftCommands::New { name, tag } => {
            let session = EditSession::new(
                name.as_str(),
                tag.as_deref().unwrap_or_default(),
                container.settings.history_limit,
            );
            let path = drafts.create(&session)?;
            output::action("Created", &path.display());
        }
        DraftCommands::Open { tag, name, force } => {
            let name = name.as_deref().unwrap_or(tag);
            let session = container.equipment().open(tag, name)?;
            let path = if *force {
                drafts.save(&session)?
            } else {
                drafts.create(&session)?
            };
            output::action("Opened", &format!("{} -> {}", session.tag, path.display()));
        }
        DraftCommands::List => {
            for name in drafts.list()? {
                output::info(&name);
            }
        }
        DraftCommands::Show { name } => {
            let session = drafts.load(name)?;
            output::info(&session_tree(&session));
        }
        DraftCommands::Payload { name } => {
            let session = drafts.load(name)?;
            let pending = session.root().pending_count();
            if pending > 0 {
                output::warning(&format!(
                    "{pending} file(s) not uploaded yet, their fields are empty below"
                ));
            }
            let json = serde_json::to_string_pretty(&build(session.root())).map_err(|e| {
                ApplicationError::OperationFailed {
                    context: "serialize payload".into(),
                    source: Box::new(e),
                }
            })?;
            output::info(&json);
        }
        DraftCommands::Edit { name, edit } => {
            let mut session = drafts.load(name)?;
            apply_edit_command(&mut session, edit)?;
            drafts.save(&session)?;
        }
        DraftCommands::Submit { name, keep } => submit(container, &drafts, name, *keep)?,
        DraftCommands::Delete { name } => {
            drafts.delete(name)?;
            output::action("Deleted", name);
        }
    }
    Ok(())
}

/// Turn one `draft edit` subcommand into a single undoable change.
fn apply_edit_command(session: &mut EditSession, edit: &EditCommand) -> CliResult<()> {
    match edit {
        EditCommand::SetIdentity { identity, target } => session.editor.apply(&Edit::SetField {
            path: target.path(),
            field: NodeField::Identity(identity.clone()),
        })?,
        EditCommand::SetTag { tag } => session.set_tag(tag),
        EditCommand::SetVideo { source, target } => {
            let path = target.path();
            let asset = asset_from(source, node_at(session.root(), path)?.video())?;
            session.editor.apply(&Edit::SetField {
                path,
                field: NodeField::Video(asset),
            })?
        }
        EditCommand::SetDatasheet { source, target } => {
            let path = target.path();
            let asset = asset_from(source, node_at(session.root(), path)?.datasheet())?;
            session.editor.apply(&Edit::SetField {
                path,
                field: NodeField::Datasheet(asset),
            })?
        }
        EditCommand::SetModel { source } => {
            let asset = asset_from(source, session.root().model_asset())?;
            session.editor.apply(&Edit::SetModelAsset(asset))?
        }
        EditCommand::SetQrImage { file } => {
            session.qr_image = session
                .qr_image
                .with_pending(PendingAsset::new(local_file(file)?));
        }
        EditCommand::AddProperty { key, value, target } => {
            let path = target.path();
            let root = session.root();
            let index = node_at(root, path)?.description().len();
            let mut next = editor::add_description_item(root, path)?;
            if let Some(key) = key {
                next = editor::update_description_item(&next, path, index, DescriptionField::Key, key)?;
            }
            if let Some(value) = value {
                next = editor::update_description_item(
                    &next,
                    path,
                    index,
                    DescriptionField::Value,
                    value,
                )?;
            }
            session.editor.commit(next);
        }
        EditCommand::SetProperty {
            index,
            field,
            value,
            target,
        } => session.editor.apply(&Edit::UpdateDescriptionItem {
            path: target.path(),
            index: *index,
            field: (*field).into(),
            value: value.clone(),
        })?,
        EditCommand::RemoveProperty { index, target } => {
            session.editor.apply(&Edit::RemoveDescriptionItem {
                path: target.path(),
                index: *index,
            })?
        }
        EditCommand::AddButton { id, image, target } => {
            let path = target.path();
            let root = session.root();
            let index = node_at(root, path)?.buttons().len();
            let mut next = editor::add_button(root, path)?;
            if id.is_some() || image.is_some() {
                let mut button = ButtonDescriptor::new(id.clone().unwrap_or_default(), "");
                if let Some(image) = image {
                    button.pending = Some(PendingAsset::new(local_file(image)?));
                }
                next = editor::update_button(&next, path, index, button)?;
            }
            session.editor.commit(next);
        }
        EditCommand::SetButton {
            index,
            id,
            image,
            image_name,
            target,
        } => {
            let path = target.path();
            let mut button = node_at(session.root(), path)?
                .buttons()
                .get(*index)
                .cloned()
                .unwrap_or_default();
            if let Some(id) = id {
                button.id = id.clone();
            }
            if let Some(image) = image {
                button.pending = Some(PendingAsset::new(local_file(image)?));
            }
            if let Some(name) = image_name {
                button.image_file_name = name.clone();
                button.pending = None;
            }
            session.editor.apply(&Edit::UpdateButton {
                path,
                index: *index,
                button,
            })?
        }
        EditCommand::RemoveButton { index, target } => session.editor.apply(&Edit::RemoveButton {
            path: target.path(),
            index: *index,
        })?,
        EditCommand::AddPart { identity } => {
            let root = session.root();
            let index = root.parts().len();
            let mut next = editor::add_part(root);
            if let Some(identity) = identity {
                next = editor::set_field(
                    &next,
                    NodePath::Part(index),
                    NodeField::Identity(identity.clone()),
                )?;
            }
            session.editor.commit(next);
        }
        EditCommand::RemovePart { index } => {
            session.editor.apply(&Edit::RemovePart { index: *index })?
        }
        EditCommand::Undo => {
            if !session.editor.undo() {
                output::warning("nothing to undo");
            }
        }
        EditCommand::Redo => {
            if !session.editor.redo() {
                output::warning("nothing to redo");
            }
        }
    }
    output::success(&format!("updated draft {}", session.name));
    Ok(())
}

/// A pending local file keeps the current reference until it is uploaded.
fn asset_from(source: &AssetSource, current: &AssetRef) -> CliResult<AssetRef> {
    match (&source.file, &source.url) {
        (Some(file), _) => Ok(current.with_pending(PendingAsset::new(local_file(file)?))),
        (None, Some(url)) => Ok(AssetRef::uploaded(url.clone())),
        (None, None) => Err(CliError::InvalidArgs(
            "either --file or --url is required".into(),
        )),
    }
}

/// Drafts outlive the shell they were edited in, so files are stored absolute.
fn local_file(file: &Path) -> CliResult<PathBuf> {
    if !file.is_file() {
        return Err(CliError::InvalidArgs(format!(
            "not a file: {}",
            file.display()
        )));
    }
    std::fs::canonicalize(file)
        .map_err(|e| CliError::from(InfraError::io(format!("resolve {}", file.display()), e)))
}

#[instrument(skip(container, drafts))]
fn submit(container: &ServiceContainer, drafts: &DraftStore, name: &str, keep: bool) -> CliResult<()> {
    let mut session = drafts.load(name)?;
    validate_submission(session.root(), &session.tag).map_err(ApplicationError::from)?;

    let pending = session.root().pending_count();
    if pending > 0 {
        output::header(&format!("Uploading {pending} file(s)"));
        let (resolved, report) = container.uploads().resolve(session.root());
        session.editor.commit(resolved);
        // Completed uploads are kept even when others failed.
        drafts.save(&session)?;
        print_upload_report(&report);
        if !report.is_clean() {
            return Err(ApplicationError::PendingUploads(report.failures.len()).into());
        }
    }

    let outcome = container.equipment().submit(&session)?;
    for identity in &outcome.duplicate_parts {
        output::warning(&format!("part name {identity} is used more than once"));
    }
    let verb = if outcome.updated { "Updated" } else { "Created" };
    output::success(&format!(
        "{verb} equipment {} ({})",
        outcome.tag, outcome.identity
    ));
    if let Some(url) = &outcome.qr_image_url {
        output::success_detail(&format!("QR image uploaded: {url}"));
    }

    if keep {
        session.origin = Some(Origin {
            tag: outcome.tag,
            identity: outcome.identity,
        });
        if let Some(url) = outcome.qr_image_url {
            session.qr_image = AssetRef::uploaded(url);
        }
        drafts.save(&session)?;
    } else {
        drafts.delete(name)?;
        output::detail(&format!("draft {name} removed"));
    }
    Ok(())
}

fn print_upload_report(report: &UploadReport) {
    for slot in &report.uploaded {
        output::success_detail(slot);
    }
    for failure in &report.failures {
        output::failure(&format!(
            "{} ({}): {}",
            failure.slot,
            failure.file.display(),
            failure.error
        ));
    }
}

// ============================================================
// config
// ============================================================

fn config_command(settings: &Settings, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global config", &path.display()),
                None => output::warning("no config directory on this platform"),
            }
            output::action("Drafts", &settings.draft_dir.display());
        }
    }
    Ok(())
}

// ============================================================
// tree rendering
// ============================================================

fn session_tree(session: &EditSession) -> Tree<String> {
    let root = session.root();
    let mut label = format!("{} [{}]", or_unnamed(root.identity()), or_unnamed(&session.tag));
    if let Some(origin) = &session.origin {
        label.push_str(&format!(" (stored as {} / {})", origin.tag, origin.identity));
    }

    let mut tree = Tree::new(label);
    tree.push(asset_leaf("3D model", root.model_asset()));
    if !session.qr_image.asset_url.is_empty() || session.qr_image.is_pending() {
        tree.push(asset_leaf("QR image", &session.qr_image));
    }
    push_node_leaves(&mut tree, root);

    if !root.parts().is_empty() {
        let mut parts = Tree::new("parts".to_string());
        for (i, part) in root.parts().iter().enumerate() {
            let mut node = Tree::new(format!("{i}: {}", or_unnamed(part.identity())));
            push_node_leaves(&mut node, part);
            parts.push(node);
        }
        tree.push(parts);
    }
    tree
}

fn push_node_leaves(tree: &mut Tree<String>, node: &ModelNode) {
    tree.push(asset_leaf("video", node.video()));
    tree.push(asset_leaf("datasheet", node.datasheet()));
    if !node.description().is_empty() {
        tree.push(
            Tree::new("properties".to_string()).with_leaves(
                node.description()
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format!("{i}: {} = {}", item.key, item.value)),
            ),
        );
    }
    if !node.buttons().is_empty() {
        tree.push(
            Tree::new("buttons".to_string()).with_leaves(node.buttons().iter().enumerate().map(
                |(i, b)| {
                    let image = match &b.pending {
                        Some(p) => format!("{} (pending upload)", p.path().display()),
                        None => or_none(&b.image_file_name),
                    };
                    format!("{i}: {} -> {}", or_unnamed(&b.id), image)
                },
            )),
        );
    }
}

fn asset_leaf(label: &str, asset: &AssetRef) -> Tree<String> {
    let value = match &asset.pending {
        Some(p) => format!("{} (pending upload)", p.path().display()),
        None => or_none(&asset.asset_url),
    };
    Tree::new(format!("{label}: {value}"))
}

fn or_unnamed(value: &str) -> String {
    if value.is_empty() {
        output::dim("(unnamed)")
    } else {
        value.to_string()
    }
}

fn or_none(value: &str) -> String {
    if value.is_empty() {
        output::dim("none")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::domain::DescriptionItem;
    use crate::infrastructure::traits::RealFileSystem;
    use crate::util::testing::FakeBackend;

    fn session_with_part() -> EditSession {
        let mut session = EditSession::new("pump", "pomp-001", 10);
        session.editor.apply(&Edit::SetField {
            path: NodePath::Root,
            field: NodeField::Identity("Vanne 1".into()),
        })
        .unwrap();
        session.editor.apply(&Edit::AddPart).unwrap();
        session
    }

    #[test]
    fn given_add_property_with_key_and_value_then_single_undo_step() {
        let mut session = session_with_part();
        apply_edit_command(
            &mut session,
            &EditCommand::AddProperty {
                key: Some("Pressure".into()),
                value: Some("10 bar".into()),
                target: crate::cli::args::Target { part: Some(0) },
            },
        )
        .unwrap();

        assert_eq!(
            session.root().parts()[0].description(),
            &[DescriptionItem::new("Pressure", "10 bar")]
        );
        assert!(session.editor.undo());
        assert!(session.root().parts()[0].description().is_empty());
    }

    #[test]
    fn given_add_part_with_identity_then_name_normalized() {
        let mut session = session_with_part();
        apply_edit_command(
            &mut session,
            &EditCommand::AddPart {
                identity: Some("Cover Plate".into()),
            },
        )
        .unwrap();

        assert_eq!(session.root().parts()[1].identity(), "Cover_Plate");
    }

    #[test]
    fn given_edit_on_missing_part_then_index_error() {
        let mut session = session_with_part();
        let result = apply_edit_command(
            &mut session,
            &EditCommand::RemoveButton {
                index: 0,
                target: crate::cli::args::Target { part: Some(3) },
            },
        );

        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), crate::exitcode::USAGE);
    }

    fn container_with(backend: Arc<FakeBackend>, temp: &TempDir) -> ServiceContainer {
        let settings = Settings {
            draft_dir: temp.path().join("drafts"),
            ..Settings::default()
        };
        ServiceContainer::with_deps(settings, Arc::new(RealFileSystem), backend)
    }

    fn draft_with_pending_video(container: &ServiceContainer, temp: &TempDir) {
        let video = temp.path().join("intro.mp4");
        std::fs::write(&video, b"mp4").unwrap();
        let mut session = session_with_part();
        apply_edit_command(
            &mut session,
            &EditCommand::SetVideo {
                source: AssetSource {
                    file: Some(video),
                    url: None,
                },
                target: crate::cli::args::Target { part: Some(0) },
            },
        )
        .unwrap();
        container.drafts().create(&session).unwrap();
    }

    #[test]
    fn given_draft_with_pending_file_when_submitted_then_persisted_and_draft_removed() {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let container = container_with(backend.clone(), &temp);
        draft_with_pending_video(&container, &temp);

        submit(&container, &container.drafts(), "pump", false).unwrap();

        let model = backend.model("Vanne_1").unwrap();
        assert_eq!(model.parts[0].video, "/assets/files/intro.mp4");
        assert!(backend.equipment("POMP-001").is_some());
        assert!(!container.drafts().exists("pump"));
    }

    #[test]
    fn given_backend_rejects_model_when_submitted_then_draft_kept_with_uploads() {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new().fail_on("create_model"));
        let container = container_with(backend, &temp);
        draft_with_pending_video(&container, &temp);

        let result = submit(&container, &container.drafts(), "pump", false);

        assert_eq!(result.unwrap_err().exit_code(), crate::exitcode::UNAVAILABLE);
        let kept = container.drafts().load("pump").unwrap();
        assert_eq!(kept.root().pending_count(), 0);
        assert_eq!(kept.root().parts()[0].video().asset_url, "/assets/files/intro.mp4");
    }

    #[test]
    fn given_keep_flag_when_submitted_then_draft_becomes_update() {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let container = container_with(backend, &temp);
        draft_with_pending_video(&container, &temp);

        submit(&container, &container.drafts(), "pump", true).unwrap();

        let kept = container.drafts().load("pump").unwrap();
        assert_eq!(
            kept.origin,
            Some(Origin {
                tag: "POMP-001".into(),
                identity: "Vanne_1".into()
            })
        );
    }

    #[test]
    fn given_keep_flag_and_pending_qr_image_when_submitted_then_stored_url_recorded() {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let container = container_with(backend, &temp);
        draft_with_pending_video(&container, &temp);
        let qr = temp.path().join("qr.png");
        std::fs::write(&qr, b"png").unwrap();
        let mut session = container.drafts().load("pump").unwrap();
        apply_edit_command(&mut session, &EditCommand::SetQrImage { file: qr }).unwrap();
        container.drafts().save(&session).unwrap();

        submit(&container, &container.drafts(), "pump", true).unwrap();

        let kept = container.drafts().load("pump").unwrap();
        assert_eq!(kept.qr_image, AssetRef::uploaded("/qr/qr.png"));
    }

    #[test]
    fn given_session_when_rendered_then_shows_parts() {
        let session = session_with_part();
        let rendered = session_tree(&session).to_string();
        assert!(rendered.contains("Vanne_1 [POMP-001]"));
        assert!(rendered.contains("parts"));
        assert!(rendered.contains("0: "));
    }
}
