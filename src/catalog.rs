//! Fixed, read-only catalogs the picker services choose from.

use rand::Rng;

pub const PHRASES: &[&str] = &[
    "you're muted",
    "not dead yet",
    "Let them.",
    "Boiling Loves Company!",
    "Must we?",
    "SRE not-sorry",
    "Honeycomb at home",
    "There is no cloud",
    "This is fine",
    "It's a trap!",
    "Not Today",
    "You had one job",
    "bruh",
    "have you tried restarting?",
    "try again after coffee",
    "deploy != release",
    "oh, just the crimes",
    "not a bug, it's a feature",
    "test in prod",
    "who broke the build?",
];

pub const IMAGE_FILENAMES: &[&str] = &[
    "Angrybird.JPG",
    "Arco&Tub.png",
    "IMG_9343.jpg",
    "angry-lemon-ufo.JPG",
    "austintiara4.png",
    "baby-geese.jpg",
    "bbq.jpg",
    "beach.JPG",
    "bunny-mask.jpg",
    "busted-light.jpg",
    "cat-glowing-eyes.JPG",
    "cat-on-leash.JPG",
    "cat.jpg",
    "clementine.png",
    "cow-peeking.jpg",
    "different-animals-01.png",
    "dratini.png",
    "everything-is-an-experiment.png",
    "experiment.png",
    "fine-food.jpg",
    "flower.jpg",
    "frenwho.png",
    "genshin-spa.jpg",
    "grass-and-desert-guy.png",
    "honeycomb-dogfood-logo.png",
    "horse-maybe.png",
    "is-this-emeri.png",
    "jean-and-statue.png",
    "jessitron.png",
    "keys-drying.jpg",
    "lime-on-soap-dispenser.jpg",
    "loki-closeup.jpg",
    "lynia.png",
    "ninguang-at-work.png",
    "paul-r-allen.png",
    "please.png",
    "roswell-nose.jpg",
    "roswell.JPG",
    "salt-packets-in-jar.jpg",
    "scarred-character.png",
    "square-leaf-with-nuts.jpg",
    "stu.jpeg",
    "sweating-it.png",
    "tanuki.png",
    "tennessee-sunset.JPG",
    "this-is-fine-trash.jpg",
    "three-pillars-2.png",
    "trash-flat.jpg",
    "walrus-painting.jpg",
    "windigo.png",
    "yellow-lines.JPG",
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog must contain at least one entry")]
    Empty,
}

/// A non-empty list of strings with a uniform random pick.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<String>,
}

impl Catalog {
    pub fn new<I, S>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { entries })
    }

    /// The built-in caption phrases.
    pub fn phrases() -> Self {
        Self {
            entries: PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// The built-in image filenames, templated into public S3 URLs for `bucket`.
    pub fn images(bucket: &str) -> Self {
        Self {
            entries: IMAGE_FILENAMES
                .iter()
                .map(|f| image_url(bucket, f))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    pub fn pick(&self) -> &str {
        self.pick_with(&mut rand::thread_rng())
    }

    pub fn pick_with<R: Rng>(&self, rng: &mut R) -> &str {
        // non-empty by construction
        &self.entries[rng.gen_range(0..self.entries.len())]
    }
}

pub fn image_url(bucket: &str, filename: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{filename}")
}
