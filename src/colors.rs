//! Technology → display color, shared by the chart legend and map markers.

pub const FALLBACK_COLOR: &str = "whitesmoke";

/// Order matters: the chart legend lists technologies in this order.
pub const PALETTE: [(&str, &str); 19] = [
    ("Hydro Pumped Storage", "teal"),
    ("Hydro Water Reservoir", "teal"),
    ("Hydro Run-of-river and poundage", "cyan"),
    ("Hydro", "teal"),
    ("Wind Onshore", "blue"),
    ("Wind Offshore", "blue"),
    ("Nuclear", "purple"),
    ("Solar", "yellow"),
    ("Biomass", "forestgreen"),
    ("Waste", "darkgreen"),
    ("Geothermal", "olive"),
    ("Fossil Gas", "grey"),
    ("Fossil Coal-derived gas", "grey"),
    ("Fossil Brown coal/Lignite", "brown"),
    ("Fossil Hard coal", "brown"),
    ("Fossil Peat", "brown"),
    ("Fossil Oil shale", "red"),
    ("Fossil Oil", "red"),
    ("Other", FALLBACK_COLOR),
];

/// Technologies without a palette entry render like "Other".
pub fn technology_color(technology: &str) -> &'static str {
    PALETTE
        .iter()
        .find(|(t, _)| *t == technology)
        .map(|(_, c)| *c)
        .unwrap_or(FALLBACK_COLOR)
}

pub fn legend_domain() -> Vec<&'static str> {
    PALETTE.iter().map(|(t, _)| *t).collect()
}

pub fn legend_range() -> Vec<&'static str> {
    PALETTE.iter().map(|(_, c)| *c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_technologies() {
        assert_eq!(technology_color("Nuclear"), "purple");
        assert_eq!(technology_color("Fossil Hard coal"), "brown");
        assert_eq!(technology_color("Fusion"), FALLBACK_COLOR);
    }

    #[test]
    fn legend_domain_and_range_align() {
        assert_eq!(legend_domain().len(), legend_range().len());
        assert_eq!(legend_domain()[6], "Nuclear");
        assert_eq!(legend_range()[6], "purple");
    }
}
