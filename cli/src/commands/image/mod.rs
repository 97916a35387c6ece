//! `stackit image` - server images of a project.

mod create;
mod delete;
mod describe;
mod list;
mod update;

use clap::{Args, Subcommand};
use serde::Serialize;
use stackit_api::ApiClient;
use stackit_api::iaas::{GetImageRequest, ImageConfig, Labels};
use std::collections::BTreeMap;

use crate::commands::CmdParams;
use crate::errors::CliError;

#[derive(Subcommand, Debug, PartialEq)]
pub enum ImageCommands {
    /// Lists images
    List(list::ListArgs),

    /// Describes an image
    Describe(describe::DescribeArgs),

    /// Creates an image and uploads its data
    Create(create::CreateArgs),

    /// Updates an image
    Update(update::UpdateArgs),

    /// Deletes an image
    Delete(delete::DeleteArgs),
}

impl ImageCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            ImageCommands::List(args) => list::handle_list(params, args).await,
            ImageCommands::Describe(args) => describe::handle_describe(params, args).await,
            ImageCommands::Create(args) => create::handle_create(params, args).await,
            ImageCommands::Update(args) => update::handle_update(params, args).await,
            ImageCommands::Delete(args) => delete::handle_delete(params, args).await,
        }
    }
}

/// Hardware and OS properties shared by create and update.
#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageConfigFlags {
    /// Architecture of the image, e.g. x86 or arm64
    #[arg(long)]
    pub architecture: Option<String>,

    /// Enables the BIOS boot menu
    #[arg(long = "boot-menu", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub boot_menu: Option<bool>,

    /// Sets CDROM bus controller type
    #[arg(long = "cdrom-bus")]
    pub cdrom_bus: Option<String>,

    /// Sets Disk bus controller type
    #[arg(long = "disk-bus")]
    pub disk_bus: Option<String>,

    /// Sets virtual NIC model
    #[arg(long = "nic-model")]
    pub nic_model: Option<String>,

    /// Enables operating system specific optimizations
    #[arg(long = "os")]
    pub operating_system: Option<String>,

    /// Operating system distribution
    #[arg(long = "os-distro")]
    pub operating_system_distro: Option<String>,

    /// Version of the operating system
    #[arg(long = "os-version")]
    pub operating_system_version: Option<String>,

    /// Sets the device bus when the image is used as a rescue image
    #[arg(long = "rescue-bus", requires = "rescue_device")]
    pub rescue_bus: Option<String>,

    /// Sets the device when the image is used as a rescue image
    #[arg(long = "rescue-device", requires = "rescue_bus")]
    pub rescue_device: Option<String>,

    /// Enables Secure Boot
    #[arg(long = "secure-boot", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub secure_boot: Option<bool>,

    /// Enables UEFI boot (defaults to true on create)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub uefi: Option<bool>,

    /// Sets Graphic device model
    #[arg(long = "video-model")]
    pub video_model: Option<String>,

    /// Enables the use of VirtIO SCSI to provide block device access
    #[arg(long = "virtio-scsi", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub virtio_scsi: Option<bool>,
}

impl ImageConfigFlags {
    /// Only explicitly passed flags end up in the payload.
    pub fn to_config(&self) -> ImageConfig {
        ImageConfig {
            architecture: self.architecture.clone(),
            boot_menu: self.boot_menu,
            cdrom_bus: self.cdrom_bus.clone(),
            disk_bus: self.disk_bus.clone(),
            nic_model: self.nic_model.clone(),
            operating_system: self.operating_system.clone(),
            operating_system_distro: self.operating_system_distro.clone(),
            operating_system_version: self.operating_system_version.clone(),
            rescue_bus: self.rescue_bus.clone(),
            rescue_device: self.rescue_device.clone(),
            secure_boot: self.secure_boot,
            uefi: self.uefi,
            video_model: self.video_model.clone(),
            virtio_scsi: self.virtio_scsi,
        }
    }
}

pub fn to_labels(labels: &Option<BTreeMap<String, String>>) -> Option<Labels> {
    labels.as_ref().map(|labels| {
        labels
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect()
    })
}

/// Image name for prompts and messages, the id when the lookup fails.
async fn image_label(params: &CmdParams, client: &ApiClient, request: GetImageRequest) -> String {
    match request.execute(client).await {
        Ok(image) => match image.name {
            Some(name) if !name.is_empty() => name,
            _ => request.image_id,
        },
        Err(e) => {
            params.printer.debug(format!("get image name: {e}"));
            request.image_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        config: ImageConfigFlags,
    }

    #[test]
    fn test_rescue_flags_are_required_together() {
        let err = Harness::try_parse_from(["stackit", "--rescue-bus", "ide"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        let ok = Harness::try_parse_from([
            "stackit",
            "--rescue-bus",
            "ide",
            "--rescue-device",
            "cdrom",
        ])
        .unwrap();
        assert_eq!(ok.config.rescue_device.as_deref(), Some("cdrom"));
    }

    #[test]
    fn test_config_is_sparse() {
        let parsed = Harness::try_parse_from(["stackit", "--uefi=false"]).unwrap();
        let config = parsed.config.to_config();
        assert_eq!(config.uefi, Some(false));
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({"uefi": false})
        );
    }
}
