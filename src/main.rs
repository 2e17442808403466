use anyhow::Context;

use tushou_infer::InferenceConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = InferenceConfig::from_env().context("failed to load the configuration")?;
    let report = tushou_infer::run(&config).with_context(|| {
        format!(
            "failed to evaluate {} with the model in {}",
            config.data_dir.display(),
            config.model_dir.display()
        )
    })?;

    println!("Test error: {:.1}%", report.error_rate);
    Ok(())
}
