use anyhow::{bail, Result};
use rifeport_core::ArchVariant;

const INPUT_IMG0: &str = "img0";
const INPUT_IMG1: &str = "img1";
const INPUT_TIMESTEP: &str = "timestep";

/// How a flow network wants its two frames (and the timestep) fed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputLayout {
    /// `img0`, `img1` as `[1, 3, H, W]` plus a `[1, 1, 1, 1]` timestep.
    Separate {
        img0: String,
        img1: String,
        timestep: String,
    },
    /// One `[1, 7, H, W]` input: both frames and a constant timestep plane.
    Concatenated { input: String },
    /// Two frames, no timestep: the network always predicts the midpoint.
    MidpointOnly { img0: String, img1: String },
}

impl InputLayout {
    /// Picks the layout from the session's input names. Names are matched
    /// when the network uses the usual ones, otherwise the session order is
    /// taken as `frame0, frame1[, timestep]`.
    pub fn detect(names: &[String]) -> Result<Self> {
        match names {
            [input] => Ok(Self::Concatenated {
                input: input.clone(),
            }),
            [a, b] => {
                let (img0, img1) = ordered_pair(a, b);
                Ok(Self::MidpointOnly { img0, img1 })
            }
            [_, _, _] => {
                let find = |wanted: &str| names.iter().find(|n| n.as_str() == wanted).cloned();
                match (find(INPUT_IMG0), find(INPUT_IMG1), find(INPUT_TIMESTEP)) {
                    (Some(img0), Some(img1), Some(timestep)) => Ok(Self::Separate {
                        img0,
                        img1,
                        timestep,
                    }),
                    _ => Ok(Self::Separate {
                        img0: names[0].clone(),
                        img1: names[1].clone(),
                        timestep: names[2].clone(),
                    }),
                }
            }
            other => bail!(
                "unsupported flow network signature with {} inputs: {:?}",
                other.len(),
                other
            ),
        }
    }

    pub fn takes_timestep(&self) -> bool {
        !matches!(self, Self::MidpointOnly { .. })
    }

    /// V4 networks are trained with an explicit timestep; a V4-named model
    /// without one is almost certainly a mislabeled export.
    pub fn check_variant(&self, variant: ArchVariant) -> Result<()> {
        if variant.takes_timestep() && !self.takes_timestep() {
            bail!("{variant} model exposes no timestep input");
        }
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Separate { .. } => "separate",
            Self::Concatenated { .. } => "concatenated",
            Self::MidpointOnly { .. } => "midpoint",
        }
    }
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a == INPUT_IMG1 && b == INPUT_IMG0 {
        (b.to_string(), a.to_string())
    } else {
        (a.to_string(), b.to_string())
    }
}
