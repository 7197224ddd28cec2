use clap::ValueEnum;
use glotpipe::VariantKind;

/// Which app a metadata lane runs for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    Wordpress,
    Jetpack,
    /// WordPress, then Jetpack
    #[default]
    Both,
}

impl VariantArg {
    pub fn kinds(self) -> Vec<VariantKind> {
        match self {
            VariantArg::Wordpress => vec![VariantKind::WordPress],
            VariantArg::Jetpack => vec![VariantKind::Jetpack],
            VariantArg::Both => VariantKind::ALL.to_vec(),
        }
    }
}
