use std::{
    env, fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use log::info;
use machine_learning::{
    arch::{NetShape, ops::{ConvStrategy, OutputFn}},
    evaluation::TailPolicy,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{LoadErr, Result},
    loader::DatasetShape,
};

/// Path of a JSON file with an [`InferenceConfig`].
pub const CONFIG_VAR: &str = "TUSHOU_CONFIG";
pub const DATA_DIR_VAR: &str = "DATA_DIR";
pub const MODEL_DIR_VAR: &str = "MODEL_DIR";
pub const EVAL_BATCH_SIZE_VAR: &str = "EVAL_BATCH_SIZE";

const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => unreachable!(),
};

/// Everything a test run needs besides the files themselves.
///
/// Missing JSON fields take their default value, which reproduces the MNIST setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    pub images_file: String,
    pub labels_file: String,
    /// How many images and labels to read from the dataset.
    pub num_images: usize,
    /// Maximum pixel value, used to center and scale the raw bytes.
    pub pixel_depth: f32,
    pub eval_batch_size: NonZeroUsize,
    pub tail: TailPolicy,
    /// Whether batches are forwarded on the rayon thread pool.
    pub parallel: bool,
    pub output: OutputFn,
    pub conv: ConvStrategy,
    pub net: NetShape,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            model_dir: PathBuf::from("model"),
            images_file: "t10k-images-idx3-ubyte.gz".to_string(),
            labels_file: "t10k-labels-idx1-ubyte.gz".to_string(),
            num_images: 10_000,
            pixel_depth: 255.0,
            eval_batch_size: DEFAULT_BATCH_SIZE,
            tail: TailPolicy::default(),
            parallel: false,
            output: OutputFn::default(),
            conv: ConvStrategy::default(),
            net: NetShape::mnist(),
        }
    }
}

impl InferenceConfig {
    /// Reads a configuration from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The JSON file.
    ///
    /// # Returns
    /// The validated configuration or an io, JSON or `Config` error.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration of the binary.
    ///
    /// Starts from the file named by `TUSHOU_CONFIG`, or the defaults if it isn't set, and then
    /// applies the `DATA_DIR`, `MODEL_DIR` and `EVAL_BATCH_SIZE` overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var(CONFIG_VAR) {
            Ok(path) => {
                info!("reading config from {path}");
                Self::from_json_file(path)?
            }
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields with the values `lookup` returns for the override variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_VAR) {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup(MODEL_DIR_VAR) {
            self.model_dir = PathBuf::from(dir);
        }

        if let Some(size) = lookup(EVAL_BATCH_SIZE_VAR) {
            self.eval_batch_size = size.trim().parse().map_err(|_| {
                LoadErr::Config(format!(
                    "{EVAL_BATCH_SIZE_VAR} must be a positive integer, got {size:?}"
                ))
            })?;
        }

        Ok(())
    }

    /// Checks the invariants serde can't express.
    pub fn validate(&self) -> Result<()> {
        let size = self.net.image_size;
        if size == 0 || size % 4 != 0 {
            return Err(LoadErr::Config(format!(
                "image size must be a positive multiple of 4, got {size}"
            )));
        }

        if self.net.kernel_size == 0 {
            return Err(LoadErr::Config("kernel size must be positive".to_string()));
        }

        if !(self.pixel_depth > 0.0) {
            return Err(LoadErr::Config(format!(
                "pixel depth must be positive, got {}",
                self.pixel_depth
            )));
        }

        if self.num_images == 0 {
            return Err(LoadErr::Config("num_images must be positive".to_string()));
        }

        Ok(())
    }

    pub fn images_path(&self) -> PathBuf {
        self.data_dir.join(&self.images_file)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.data_dir.join(&self.labels_file)
    }

    /// The layout the IDX image reader expects.
    pub fn dataset_shape(&self) -> DatasetShape {
        DatasetShape {
            image_size: self.net.image_size,
            num_channels: self.net.num_channels,
            pixel_depth: self.pixel_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_reproduce_mnist_setup() {
        let config = InferenceConfig::default();

        assert_eq!(config.net, NetShape::mnist());
        assert_eq!(config.eval_batch_size.get(), 64);
        assert_eq!(config.num_images, 10_000);
        assert_eq!(config.pixel_depth, 255.0);
        assert_eq!(
            config.images_path(),
            PathBuf::from("data/t10k-images-idx3-ubyte.gz")
        );
        assert_eq!(
            config.labels_path(),
            PathBuf::from("data/t10k-labels-idx1-ubyte.gz")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: InferenceConfig = serde_json::from_str(
            r#"{
                "model_dir": "weights",
                "parallel": true,
                "output": "softmax",
                "conv": "direct",
                "tail": "ragged",
                "net": { "fc1_units": 128 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.model_dir, PathBuf::from("weights"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.parallel);
        assert_eq!(config.output, OutputFn::Softmax);
        assert_eq!(config.conv, ConvStrategy::Direct);
        assert_eq!(config.tail, TailPolicy::Ragged);
        assert_eq!(config.net.fc1_units, 128);
        assert_eq!(config.net.image_size, 28);
    }

    #[test]
    fn zero_batch_size_is_rejected_by_serde() {
        let res = serde_json::from_str::<InferenceConfig>(r#"{ "eval_batch_size": 0 }"#);
        assert!(res.is_err());
    }

    #[test]
    fn reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "num_images": 70, "eval_batch_size": 32 }}"#).unwrap();

        let config = InferenceConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.num_images, 70);
        assert_eq!(config.eval_batch_size.get(), 32);
    }

    #[test]
    fn invalid_json_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(
            InferenceConfig::from_json_file(file.path()),
            Err(LoadErr::Json(_))
        ));
    }

    #[test]
    fn overrides_replace_fields() {
        let mut config = InferenceConfig::default();
        config
            .apply_overrides(lookup(&[
                ("DATA_DIR", "/tmp/mnist"),
                ("EVAL_BATCH_SIZE", "128"),
            ]))
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/mnist"));
        assert_eq!(config.model_dir, PathBuf::from("model"));
        assert_eq!(config.eval_batch_size.get(), 128);
    }

    #[test]
    fn bad_batch_size_override_fails() {
        for value in ["0", "-3", "many"] {
            let mut config = InferenceConfig::default();
            let res = config.apply_overrides(lookup(&[("EVAL_BATCH_SIZE", value)]));
            assert!(matches!(res, Err(LoadErr::Config(_))), "{value}");
        }
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = InferenceConfig::default();
        config.net.image_size = 30;
        assert!(matches!(config.validate(), Err(LoadErr::Config(_))));

        let mut config = InferenceConfig::default();
        config.pixel_depth = 0.0;
        assert!(matches!(config.validate(), Err(LoadErr::Config(_))));

        let mut config = InferenceConfig::default();
        config.num_images = 0;
        assert!(matches!(config.validate(), Err(LoadErr::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_kernel() {
        let config: InferenceConfig =
            serde_json::from_str(r#"{ "net": { "kernel_size": 0 } }"#).unwrap();

        assert!(matches!(
            config.validate(),
            Err(LoadErr::Config(msg)) if msg.contains("kernel size")
        ));
    }

    #[test]
    fn even_kernel_is_accepted() {
        let mut config = InferenceConfig::default();
        config.net.kernel_size = 4;
        assert!(config.validate().is_ok());
    }
}
