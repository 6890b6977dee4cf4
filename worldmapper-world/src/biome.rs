/// Vanilla biome names indexed by biome id, lowercase with spaces removed.
pub const BIOME_NAMES: [&str; 40] = [
    "ocean",
    "plains",
    "desert",
    "extremehills",
    "forest",
    "taiga",
    "swampland",
    "river",
    "hell",
    "sky",
    "frozenocean",
    "frozenriver",
    "iceplains",
    "icemountains",
    "mushroomisland",
    "mushroomislandshore",
    "beach",
    "deserthills",
    "foresthills",
    "taigahills",
    "extremehillsedge",
    "jungle",
    "junglehills",
    // 1.7
    "jungleedge",
    "deepocean",
    "stonebeach",
    "coldbeach",
    "birchforest",
    "birchforesthills",
    "roofedforest",
    "coldtaiga",
    "coldtaigahills",
    "megataiga",
    "megataigahills",
    "extremehills+",
    "savanna",
    "savannaplateau",
    "mesa",
    "mesaplateauf",
    "mesaplateau",
];

/// Looks a biome up by display name, ignoring case and spaces.
pub fn find_biome_id(name: &str) -> Option<u8> {
    let normalized = name.to_lowercase().replace(' ', "");
    BIOME_NAMES
        .iter()
        .position(|biome| *biome == normalized)
        .map(|id| id as u8)
}
