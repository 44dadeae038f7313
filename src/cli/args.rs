//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::{DescriptionField, NodePath};

/// Administer AR equipment records and their 3D model hierarchies
#[derive(Parser, Debug)]
#[command(name = "mxlab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug logging on stderr (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Backend base URL (overrides config and MXLAB_API_BASE_URL)
    #[arg(long, global = true, value_hint = ValueHint::Url)]
    pub api_url: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/mxlab/mxlab.toml)
    #[arg(long, global = true, env = "MXLAB_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Browse equipments stored in the backend
    Equipment {
        #[command(subcommand)]
        command: EquipmentCommands,
    },

    /// Create, edit and submit local drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum EquipmentCommands {
    /// List all equipments
    List,

    /// Show one equipment with its model hierarchy
    Show {
        /// Equipment tag
        tag: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DraftCommands {
    /// Start a draft for a new equipment
    New {
        /// Draft name
        name: String,
        /// Equipment tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Start a draft from an existing equipment
    Open {
        /// Equipment tag
        tag: String,
        /// Draft name (default: the tag)
        #[arg(short, long)]
        name: Option<String>,
        /// Replace an existing draft of the same name
        #[arg(short, long)]
        force: bool,
    },

    /// List drafts
    List,

    /// Show a draft as a tree
    Show {
        /// Draft name
        name: String,
    },

    /// Print the JSON the backend would receive
    Payload {
        /// Draft name
        name: String,
    },

    /// Apply one edit to a draft
    Edit {
        /// Draft name
        name: String,
        #[command(subcommand)]
        edit: EditCommand,
    },

    /// Upload pending files, validate and persist
    Submit {
        /// Draft name
        name: String,
        /// Keep the draft after a successful submission
        #[arg(long)]
        keep: bool,
    },

    /// Delete a draft
    Delete {
        /// Draft name
        name: String,
    },
}

/// Node an edit applies to.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct Target {
    /// Apply to this part instead of the main model
    #[arg(short, long, value_name = "INDEX")]
    pub part: Option<usize>,
}

/// Description half targeted by `set-property`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyField {
    Key,
    Value,
}

#[derive(Subcommand, Debug)]
pub enum EditCommand {
    /// Rename a node (whitespace becomes `_`)
    SetIdentity {
        identity: String,
        #[command(flatten)]
        target: Target,
    },

    /// Change the equipment tag
    SetTag { tag: String },

    /// Select a video file to upload, or set an uploaded URL
    SetVideo {
        #[command(flatten)]
        source: AssetSource,
        #[command(flatten)]
        target: Target,
    },

    /// Select a datasheet file to upload, or set an uploaded URL
    SetDatasheet {
        #[command(flatten)]
        source: AssetSource,
        #[command(flatten)]
        target: Target,
    },

    /// Select the main model's 3D file to upload, or set an uploaded URL
    SetModel {
        #[command(flatten)]
        source: AssetSource,
    },

    /// Select the QR code image uploaded after submission
    SetQrImage {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Append a key/value property
    AddProperty {
        key: Option<String>,
        value: Option<String>,
        #[command(flatten)]
        target: Target,
    },

    /// Change one half of a property
    SetProperty {
        index: usize,
        #[arg(value_enum)]
        field: PropertyField,
        value: String,
        #[command(flatten)]
        target: Target,
    },

    /// Remove a property
    RemoveProperty {
        index: usize,
        #[command(flatten)]
        target: Target,
    },

    /// Append a button
    AddButton {
        id: Option<String>,
        /// Image to upload for the button
        #[arg(long, value_hint = ValueHint::FilePath)]
        image: Option<PathBuf>,
        #[command(flatten)]
        target: Target,
    },

    /// Change a button's id or image
    SetButton {
        index: usize,
        /// New button id
        #[arg(long)]
        id: Option<String>,
        /// Image to upload for the button
        #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "image_name")]
        image: Option<PathBuf>,
        /// Already uploaded image file name
        #[arg(long)]
        image_name: Option<String>,
        #[command(flatten)]
        target: Target,
    },

    /// Remove a button
    RemoveButton {
        index: usize,
        #[command(flatten)]
        target: Target,
    },

    /// Append an empty part to the main model
    AddPart {
        /// Name of the new part
        identity: Option<String>,
    },

    /// Remove a part
    RemovePart { index: usize },

    /// Revert the last edit
    Undo,

    /// Re-apply the last reverted edit
    Redo,
}

/// Either a local file to upload or an already uploaded URL.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct AssetSource {
    /// Local file, uploaded on submit
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
    /// Uploaded asset URL (empty string clears the field)
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective config
    Show,

    /// Print a config template
    Template,

    /// Show config paths
    Path,
}

impl Target {
    pub fn path(&self) -> NodePath {
        NodePath::from(self.part)
    }
}

impl From<PropertyField> for DescriptionField {
    fn from(field: PropertyField) -> Self {
        match field {
            PropertyField::Key => DescriptionField::Key,
            PropertyField::Value => DescriptionField::Value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_part_flag_when_parsing_edit_then_targets_part() {
        let cli = Cli::try_parse_from([
            "mxlab", "draft", "edit", "pump", "set-identity", "Actuator", "--part", "1",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Draft {
                command:
                    DraftCommands::Edit {
                        edit: EditCommand::SetIdentity { identity, target },
                        ..
                    },
            }) => {
                assert_eq!(identity, "Actuator");
                assert_eq!(target.path(), NodePath::Part(1));
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn given_asset_edit_without_source_when_parsing_then_rejected() {
        let result = Cli::try_parse_from(["mxlab", "draft", "edit", "pump", "set-video"]);
        assert!(result.is_err());
    }

    #[test]
    fn given_file_and_url_when_parsing_then_rejected() {
        let result = Cli::try_parse_from([
            "mxlab", "draft", "edit", "pump", "set-model", "--file", "a.glb", "--url", "/x.glb",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn given_repeated_debug_flag_then_counts_level() {
        let cli = Cli::try_parse_from(["mxlab", "-dd", "draft", "list"]).unwrap();
        assert_eq!(cli.debug, 2);
    }
}
