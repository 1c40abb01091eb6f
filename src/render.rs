//! Renderer.
//! Projects a `Chart` into a view-model of titled card rows. Pure: the chart is
//! only read. Text output and rasterized export are both built from this view.

use std::fmt::Write as _;

use crate::model::{Chart, Entry};
use crate::positions::{self, PositionDef, Section};

pub const VACANT_LABEL: &str = "Vaga disponível";
pub const NUMBER_PLACEHOLDER: &str = "---";
pub const PHOTO_PLACEHOLDER: char = '?';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhotoView {
    /// Data URL or remote URL.
    Image(String),
    Placeholder,
}

impl PhotoView {
    fn of(entry: &Entry) -> Self {
        match &entry.photo {
            Some(src) if !src.is_empty() => PhotoView::Image(src.clone()),
            _ => PhotoView::Placeholder,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardView {
    pub position_id: &'static str,
    pub title: &'static str,
    pub name: String,
    pub member_number: String,
    pub photo: PhotoView,
    pub vacant: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionView {
    pub title: &'static str,
    pub cards: Vec<CardView>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartView {
    /// Header photo of the national president.
    pub featured: PhotoView,
    pub sections: Vec<SectionView>,
}

impl ChartView {
    pub fn cards(&self) -> impl Iterator<Item = &CardView> {
        self.sections.iter().flat_map(|s| s.cards.iter())
    }

    pub fn card(&self, position_id: &str) -> Option<&CardView> {
        self.cards().find(|c| c.position_id == position_id)
    }
}

/// A filled position, for the leaders listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderView {
    pub position_id: String,
    pub title: String,
    pub name: String,
    pub member_number: String,
    pub photo: PhotoView,
}

pub fn render(chart: &Chart, include_departments: bool) -> ChartView {
    let mut sections: Vec<SectionView> = positions::SECTIONS
        .iter()
        .map(|s| render_section(chart, s, false))
        .collect();
    if include_departments {
        sections.extend(positions::DEPARTMENTS.iter().map(|s| render_section(chart, s, true)));
    }

    let featured = chart
        .get(positions::PRESIDENT_ID)
        .map(PhotoView::of)
        .unwrap_or(PhotoView::Placeholder);

    ChartView { featured, sections }
}

fn render_section(chart: &Chart, section: &Section, department: bool) -> SectionView {
    SectionView {
        title: section.title,
        cards: section
            .positions
            .iter()
            .map(|def| render_card(def, chart.get(def.id), department))
            .collect(),
    }
}

fn render_card(def: &PositionDef, entry: Option<&Entry>, department: bool) -> CardView {
    let empty = Entry::default();
    let entry = entry.unwrap_or(&empty);
    let vacant = entry.is_vacant();

    // Vacant department cards show the role instead of the vacant label.
    let name = match (vacant, department) {
        (false, _) => entry.name.clone(),
        (true, true) => def.title.to_string(),
        (true, false) => VACANT_LABEL.to_string(),
    };
    let member_number = if entry.member_number.is_empty() {
        NUMBER_PLACEHOLDER.to_string()
    } else {
        entry.member_number.clone()
    };

    CardView {
        position_id: def.id,
        title: def.title,
        name,
        member_number,
        photo: PhotoView::of(entry),
        vacant,
    }
}

/// Filled positions, known ones in display order, then any others by id.
pub fn leaders(chart: &Chart) -> Vec<LeaderView> {
    let known: Vec<&str> = positions::SECTIONS
        .iter()
        .chain(positions::DEPARTMENTS.iter())
        .flat_map(|s| s.positions.iter().map(|p| p.id))
        .collect();
    let rank = |id: &str| known.iter().position(|k| *k == id).unwrap_or(usize::MAX);

    let mut filled: Vec<(&str, &Entry)> = chart.iter().filter(|(_, e)| !e.is_vacant()).collect();
    filled.sort_by(|a, b| rank(a.0).cmp(&rank(b.0)).then(a.0.cmp(b.0)));

    filled
        .into_iter()
        .map(|(id, entry)| LeaderView {
            position_id: id.to_string(),
            title: positions::title_of(id).to_string(),
            name: entry.name.clone(),
            member_number: if entry.member_number.is_empty() {
                NUMBER_PLACEHOLDER.to_string()
            } else {
                entry.member_number.clone()
            },
            photo: PhotoView::of(entry),
        })
        .collect()
}

/// Plain-text listing of the chart view.
pub fn to_text(view: &ChartView) -> String {
    let mut out = String::new();
    for section in &view.sections {
        let _ = writeln!(out, "{}", section.title);
        for card in &section.cards {
            let photo = match card.photo {
                PhotoView::Image(_) => "foto",
                PhotoView::Placeholder => "?",
            };
            let marker = if card.vacant { " [vaga]" } else { "" };
            let _ = writeln!(
                out,
                "  {:<32} {:<28} Nº: {:<6} ({}){}",
                card.title, card.name, card.member_number, photo, marker
            );
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(name: &str, number: &str, photo: Option<&str>) -> Entry {
        Entry {
            name: name.into(),
            member_number: number.into(),
            photo: photo.map(String::from),
        }
    }

    #[test]
    fn test_vacant_chart_renders_labels() {
        let view = render(&Chart::vacant(), false);
        assert_eq!(view.cards().count(), 14);
        for card in view.cards() {
            assert_eq!(card.name, VACANT_LABEL);
            assert_eq!(card.member_number, NUMBER_PLACEHOLDER);
            assert_eq!(card.photo, PhotoView::Placeholder);
            assert!(card.vacant);
        }
        assert_eq!(view.featured, PhotoView::Placeholder);
    }

    #[test]
    fn test_filled_card_and_featured_photo() {
        let mut chart = Chart::vacant();
        chart.set("presidente-nacional", filled("ANA", "010", Some("data:x")));
        let view = render(&chart, false);

        let card = view.card("presidente-nacional").unwrap();
        assert_eq!(card.name, "ANA");
        assert_eq!(card.member_number, "010");
        assert_eq!(card.photo, PhotoView::Image("data:x".into()));
        assert!(!card.vacant);
        assert_eq!(view.featured, PhotoView::Image("data:x".into()));
        assert!(view.card("primeiro-secretario").unwrap().vacant);
    }

    #[test]
    fn test_name_without_number_uses_dash() {
        let mut chart = Chart::vacant();
        chart.set("presidente-fiscal", filled("RUI", "", None));
        let card = render(&chart, false).card("presidente-fiscal").cloned().unwrap();
        assert_eq!(card.member_number, NUMBER_PLACEHOLDER);
        assert!(!card.vacant);
    }

    #[test]
    fn test_departments_only_when_requested() {
        let chart = Chart::vacant();
        assert!(render(&chart, false).card("diretor-rh").is_none());

        let view = render(&chart, true);
        let card = view.card("diretor-rh").unwrap();
        assert_eq!(card.name, "Diretor de RH");
        assert!(card.vacant);
        assert_eq!(view.sections.len(), 8);
    }

    #[test]
    fn test_render_does_not_touch_chart() {
        let mut chart = Chart::vacant();
        chart.set("segundo-conselheiro", filled("EVA", "77", None));
        let before = chart.clone();
        let _ = render(&chart, true);
        let _ = leaders(&chart);
        assert_eq!(chart, before);
    }

    #[test]
    fn test_leaders_order_and_filter() {
        let mut chart = Chart::vacant();
        chart.set("segundo-conselheiro", filled("EVA", "77", None));
        chart.set("zz-extra", filled("ZED", "", None));
        chart.set("presidente-assembleia", filled("LUIS", "5", None));
        chart.set("primeiro-secretario", filled("   ", "9", None));

        let list = leaders(&chart);
        let ids: Vec<_> = list.iter().map(|l| l.position_id.as_str()).collect();
        assert_eq!(ids, vec!["presidente-assembleia", "segundo-conselheiro", "zz-extra"]);
        assert_eq!(list[0].title, "Presidente da Assembleia");
        assert_eq!(list[2].title, "zz-extra");
        assert_eq!(list[2].member_number, NUMBER_PLACEHOLDER);
    }

    #[test]
    fn test_text_listing_marks_vacancies() {
        let text = to_text(&render(&Chart::vacant(), false));
        assert!(text.contains("DIREÇÃO NACIONAL"));
        assert!(text.contains("[vaga]"));
    }
}
