use crate::error::UnknownField;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! fields {
    ($($variant:ident => $key:literal, $tag:literal;)+) => {
        /// Canonical identifier of a ComicInfo field.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Field {
            $($variant,)+
        }

        impl Field {
            pub const ALL: &'static [Field] = &[$(Field::$variant,)+];

            /// Lowercase identifier used by callers and in JSON payloads.
            pub fn key(self) -> &'static str {
                match self {
                    $(Field::$variant => $key,)+
                }
            }

            /// Element name inside `ComicInfo.xml`.
            pub fn tag(self) -> &'static str {
                match self {
                    $(Field::$variant => $tag,)+
                }
            }
        }
    };
}

fields! {
    Title => "title", "Title";
    Series => "series", "Series";
    Number => "number", "Number";
    IssueCount => "issuecount", "IssueCount";
    Volume => "volume", "Volume";
    AlternateSeries => "alternateseries", "AlternateSeries";
    AlternateNumber => "alternatenumber", "AlternateNumber";
    AlternateIssueCount => "alternateissuecount", "AlternateIssueCount";
    StoryArc => "storyarc", "StoryArc";
    SeriesGroup => "seriesgroup", "SeriesGroup";
    SeriesComplete => "seriescomplete", "SeriesComplete";
    VolumeCount => "volumecount", "VolumeCount";
    Year => "year", "Year";
    Month => "month", "Month";
    Day => "day", "Day";
    Format => "format", "Format";
    AgeRating => "agerating", "AgeRating";
    Manga => "manga", "Manga";
    Publisher => "publisher", "Publisher";
    Imprint => "imprint", "Imprint";
    BlackAndWhite => "blackandwhite", "BlackAndWhite";
    Language => "language", "LanguageISO";
    Genre => "genre", "Genre";
    Tags => "tags", "Tags";
    Writer => "writer", "Writer";
    Penciller => "penciller", "Penciller";
    Inker => "inker", "Inker";
    Colorist => "colorist", "Colorist";
    Letterer => "letterer", "Letterer";
    CoverArtist => "coverartist", "CoverArtist";
    Editor => "editor", "Editor";
    AuthorSort => "authorsort", "AuthorSort";
    Summary => "summary", "Summary";
    MainCharacter => "maincharacter", "MainCharacterOrTeam";
    Characters => "characters", "Characters";
    Teams => "teams", "Teams";
    Locations => "locations", "Locations";
    Notes => "notes", "Notes";
    Review => "review", "Review";
    ScanInformation => "scaninformation", "ScanInformation";
    Web => "web", "Web";
    CommunityRating => "communityrating", "CommunityRating";
    Gtin => "gtin", "GTIN";
    Read => "read", "Read";
    Country => "country", "Country";
}

impl Field {
    /// Resolves a document element name. Namespace qualification (`ns:Title`
    /// or `{uri}Title`) is stripped first; unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Field> {
        let local = tag.rsplit([':', '}']).next().unwrap_or(tag);
        Field::ALL.iter().copied().find(|field| field.tag() == local)
    }

    /// Resolves a caller-facing key. Matching ignores ASCII case and `_`/`-`
    /// separators, so `volume_count` and `storyArc` are accepted.
    pub fn from_key(key: &str) -> Option<Field> {
        let normalized: String = key
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.key() == normalized)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_key(s).ok_or_else(|| UnknownField(s.to_string()))
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}
