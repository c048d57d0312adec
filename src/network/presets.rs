use super::{Node, NodeMap};

/// Port of Tanjung Priok first: node 0 is where every tour starts and ends.
const JAVA_NODES: [(&str, f64, f64); 25] = [
    // Jabodetabek and West Java production belt
    ("Tg. Priok Port", -6.1096, 106.8837),
    ("Jakarta City", -6.2088, 106.8456),
    ("Cikarang Dry Port", -6.2863, 107.1601),
    ("Karawang KIIC", -6.3575, 107.2917),
    ("Bandung Teknopolis", -6.9175, 107.6191),
    ("Serang/Merak", -6.1104, 106.1634),
    // Pantura corridor
    ("Cirebon Port", -6.7320, 108.5523),
    ("Tegal", -6.8797, 109.1256),
    ("Pekalongan", -6.8898, 109.6746),
    ("Batang KITB", -6.9133, 110.2033),
    ("Semarang Tg Emas", -6.9472, 110.4356),
    // Central and south failover
    ("Purwokerto", -7.4245, 109.2302),
    ("Cilacap Ind.", -7.7279, 109.0077),
    ("Yogyakarta", -7.7955, 110.3695),
    ("Solo", -7.5755, 110.8243),
    ("Madiun", -7.6298, 111.5176),
    ("Tasikmalaya", -7.3274, 108.2207),
    // East Java distribution hub
    ("Tuban Industrial", -6.8976, 112.0642),
    ("Bojonegoro", -7.1502, 111.8818),
    ("Surabaya Tg Perak", -7.2023, 112.7308),
    ("Sidoarjo Waru", -7.3621, 112.7373),
    ("Mojokerto Ngoro", -7.5583, 112.6120),
    ("Pasuruan PIER", -7.6181, 112.8711),
    ("Probolinggo", -7.7543, 113.2159),
    ("Malang", -7.9666, 112.6326),
];

/// The default 25-node Java supply-chain map.
pub fn java_supply_chain() -> NodeMap {
    let nodes = JAVA_NODES
        .iter()
        .map(|&(name, lat, lon)| Node::new(name, lat, lon))
        .collect();
    NodeMap { nodes }
}

/// Raw node list of [`java_supply_chain`], for configs that embed it.
pub(crate) fn java_nodes() -> Vec<Node> {
    java_supply_chain().nodes
}
