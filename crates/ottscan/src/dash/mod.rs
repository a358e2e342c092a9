//! # MPEG-DASH manifest resolution
//!
//! Every `Representation` of every `Period` / `AdaptationSet` becomes one
//! [`Stream`] whose segments are derived from its `SegmentTemplate`
//! (inherited from the `AdaptationSet` when the representation has none):
//!
//! * with `@startNumber`, segments are addressed by `$Number$` over a
//!   presentation window, see [`addressing::number_range`];
//! * otherwise the `SegmentTimeline` is expanded into `$Time$` values, see
//!   [`addressing::timeline_timestamps`].
//!
//! `BaseURL` elements on the MPD, Period, AdaptationSet and Representation are
//! merged into the base that segment references are resolved against.

pub mod addressing;
pub mod template;

use std::time::Duration;

use dash_mpd::{BaseURL, MPD};
use url::Url;

use crate::{
    util::url::merge_baseurls, HttpClient, ScanError, ScanResult, ScanResultExt, Segment, Stream,
};
use addressing::{number_range, timeline_timestamps, TimelineEntry};
use template::Template;

/// Window used when neither the caller nor the manifest declares one.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(900);

/// Presentation window used to bound `$Number$` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashWindow {
    /// `MPD@mediaPresentationDuration`, or [`DEFAULT_WINDOW`] when absent.
    #[default]
    FromManifest,
    Fixed(Duration),
}

impl DashWindow {
    pub fn resolve(&self, mpd: &MPD) -> Duration {
        match self {
            Self::Fixed(window) => *window,
            Self::FromManifest => mpd.mediaPresentationDuration.unwrap_or(DEFAULT_WINDOW),
        }
    }
}

fn merge_base(current: &Url, base_urls: &[BaseURL]) -> ScanResult<Url> {
    match base_urls.first() {
        Some(base_url) => merge_baseurls(current, &base_url.base),
        None => Ok(current.clone()),
    }
}

/// Fetch and resolve the MPD at `url`.
pub async fn parse_dash(
    client: &HttpClient,
    url: &Url,
    window: DashWindow,
) -> ScanResult<Vec<Stream>> {
    tracing::debug!("decoding dash manifest {url}");
    let manifest = client
        .text(url)
        .await
        .with_context(|| format!("unable to download dash manifest url {url}"))?;
    parse_mpd(&manifest, url, window)
}

/// Resolve an MPD document fetched from `url`.
pub fn parse_mpd(manifest: &str, url: &Url, window: DashWindow) -> ScanResult<Vec<Stream>> {
    let mpd = dash_mpd::parse(manifest).map_err(|source| ScanError::MalformedManifest {
        url: url.to_string(),
        source,
    })?;

    let window = window.resolve(&mpd);
    tracing::debug!("presentation window {}s", window.as_secs());

    let base_url = merge_base(url, &mpd.base_url)?;
    let mut streams = Vec::new();

    for period in mpd.periods.iter() {
        let base_url = merge_base(&base_url, &period.BaseURL)?;

        for adaptation in period.adaptations.iter() {
            let base_url = merge_base(&base_url, &adaptation.BaseURL)?;

            for representation in adaptation.representations.iter() {
                let base_url = merge_base(&base_url, &representation.BaseURL)?;

                let id = representation.id.as_deref().ok_or_else(|| {
                    ScanError::MissingTemplateField {
                        representation: format!("#{}", streams.len()),
                        field: "Representation@id",
                    }
                })?;
                let missing = |field| ScanError::MissingTemplateField {
                    representation: id.to_string(),
                    field,
                };

                let segment_template = representation
                    .SegmentTemplate
                    .as_ref()
                    .or(adaptation.SegmentTemplate.as_ref())
                    .ok_or_else(|| missing("SegmentTemplate"))?;
                let media = segment_template
                    .media
                    .as_deref()
                    .ok_or_else(|| missing("@media"))?;

                let mut template = Template::for_representation(id, representation.bandwidth);
                let segment = |template: &Template| -> ScanResult<Segment> {
                    let name = template.resolve(media);
                    let url = merge_baseurls(&base_url, &name)?;
                    Ok(Segment::new(name, url, None))
                };

                let segments = if let Some(start_number) = segment_template.startNumber {
                    let duration = segment_template
                        .duration
                        .ok_or_else(|| missing("@duration"))?;
                    let timescale = segment_template.timescale.unwrap_or(1);

                    let numbers = number_range(start_number, duration as u64, timescale, window)
                        .ok_or_else(|| ScanError::InvalidTemplateField {
                            representation: id.to_string(),
                            field: "@duration",
                            value: format!("{duration} (timescale {timescale})"),
                        })?;
                    tracing::debug!(
                        "representation {id}: numbers {}..{}",
                        numbers.start,
                        numbers.end
                    );

                    numbers
                        .map(|number| {
                            template.insert(Template::NUMBER, number.to_string());
                            segment(&template)
                        })
                        .collect::<ScanResult<Vec<_>>>()?
                } else {
                    let timeline = segment_template
                        .SegmentTimeline
                        .as_ref()
                        .ok_or_else(|| missing("SegmentTimeline"))?;
                    let timestamps =
                        timeline_timestamps(timeline.segments.iter().map(TimelineEntry::from));
                    tracing::debug!("representation {id}: {} timeline segments", timestamps.len());

                    timestamps
                        .into_iter()
                        .map(|time| {
                            template.insert(Template::TIME, time.to_string());
                            segment(&template)
                        })
                        .collect::<ScanResult<Vec<_>>>()?
                };

                streams.push(Stream {
                    name: id.to_string(),
                    url: url.clone(),
                    master_playlist_url: url.clone(),
                    segments,
                });
            }
        }
    }

    Ok(streams)
}
