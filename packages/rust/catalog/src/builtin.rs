//! Built-in pattern tables.
//!
//! Names and numeric weights here are data; the defaults per category live
//! on [`Category`].

use chimei_shared::Category;
use chimei_text::KANJI_CLASS;

use crate::pattern::{PatternGroup, PatternSpec};

/// All 47 prefectures with their administrative suffix.
pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県",
    "茨城県", "栃木県", "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県",
    "新潟県", "富山県", "石川県", "福井県", "山梨県", "長野県", "岐阜県",
    "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府", "兵庫県",
    "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県",
    "徳島県", "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県",
    "熊本県", "大分県", "宮崎県", "鹿児島県", "沖縄県",
];

/// Well-known places matched literally, anywhere in a sentence.
pub const FAMOUS_PLACES: &[&str] = &[
    "銀座", "新宿", "渋谷", "上野", "浅草", "品川", "池袋", "新橋", "有楽町",
    "丸の内", "表参道", "六本木", "赤坂", "青山", "原宿", "恵比寿", "秋葉原",
    "神田", "日本橋", "本郷", "小石川", "牛込", "四谷", "麹町", "向島",
    "横浜", "川崎", "千葉", "船橋", "鎌倉", "湘南", "箱根", "江の島",
    "京都", "大阪", "神戸", "奈良", "江戸", "梅田", "難波", "祇園", "嵐山",
    "麻布", "目黒", "築地", "月島", "両国", "御茶ノ水", "市ヶ谷", "飯田橋",
    "小田原", "熱海", "軽井沢", "日光", "伏見", "宇治", "心斎橋", "天王寺",
    "名古屋", "金沢", "札幌", "函館", "小樽", "仙台", "松島", "広島", "尾道",
    "博多", "長崎", "熊本", "鹿児島", "那覇",
    // Old provinces
    "平安京", "武蔵", "相模", "甲斐", "信濃", "越後", "下野", "常陸", "下総",
    "上総", "安房", "駿河", "遠江", "伊豆", "伊勢", "山城", "大和", "河内",
    "和泉", "摂津", "近江", "美濃", "尾張", "三河", "飛騨", "薩摩", "大隅",
    "日向", "肥前", "肥後", "筑前", "筑後", "豊前", "豊後",
    // Abroad
    "パリ", "ロンドン", "ベルリン", "ウィーン", "ローマ", "モスクワ", "ペテルブルク",
    "ニューヨーク", "シカゴ", "ボストン", "サンフランシスコ", "ロサンゼルス",
    "上海", "北京", "ペキン", "南京", "天津", "大連", "ソウル", "シンガポール",
    // Landmarks of nature
    "富士山", "阿蘇山", "比叡山", "高野山", "浅間山", "琵琶湖", "中禅寺湖",
    "十和田湖", "諏訪湖", "瀬戸内海", "日本海", "太平洋", "東京湾", "利根川",
    "信濃川", "最上川", "隅田川",
];

/// Known compounds with their base/modifier decomposition.
pub const KNOWN_COMPOUNDS: &[(&str, &str)] = &[
    ("新宿", "駅前"),
    ("渋谷", "駅前"),
    ("池袋", "駅前"),
    ("品川", "駅前"),
    ("上野", "駅前"),
    ("東京", "駅前"),
    ("有楽町", "駅前"),
    ("大阪", "駅前"),
    ("梅田", "駅前"),
    ("京都", "駅前"),
    ("神戸", "駅前"),
    ("札幌", "駅前"),
    ("仙台", "駅前"),
    ("名古屋", "駅前"),
    ("広島", "駅前"),
    ("福岡", "駅前"),
    ("銀座", "周辺"),
    ("秋葉原", "周辺"),
    ("難波", "周辺"),
    ("江戸", "城下"),
    ("京都御所", "周辺"),
    ("奈良公園", "周辺"),
];

/// Common words that look like place names to the patterns.
pub const STOPWORDS: &[&str] = &[
    "今日", "昨日", "明日", "時間", "場合", "問題", "分野", "視野", "市町村",
];

/// Leading words that make a match a time expression (今朝, 昨日, ...).
pub const TIME_PREFIXES: &[&str] = &[
    "今", "先日", "昨日", "明日", "今日", "今夜", "夕方", "朝", "午前", "午後", "最近", "時",
];

/// Shapes of common nouns that the place patterns also match.
pub const IMPLAUSIBLE_SHAPES: &[&str] = &[
    "(?:[店屋会館部課室科組]|[会商]社|新聞社|出版社)$",
    "(?:病|医|議|学)院$",
    "^[一二三四五六七八九十百千]+[つ人番度回本枚個軒杯]",
    "[時分秒日月年]$",
    "[前後左右上下中内外]$",
    "[大小高低長短新旧]$",
    "道$",
    "都市$",
];

/// Categories whose two-character matches are mostly ordinary words (沢山, 野原).
pub const SHORT_NAME_CATEGORIES: &[Category] = &[Category::City, Category::NaturalPlace];

/// Surnames that the natural-feature patterns also match.
pub const COMMON_SURNAMES: &[&str] = &[
    "飯島", "田中", "佐藤", "鈴木", "高橋", "渡辺", "伊藤", "山田", "中村", "小林",
    "長谷川", "小野寺", "石川", "中川", "小川", "中島", "北島", "宮崎", "山崎",
];

/// Suffixes that turn the preceding name into a person.
pub const HONORIFICS: &[&str] = &["さん", "ちゃん", "君", "氏", "様", "先生"];

/// Build the built-in specs, with `extra_famous` appended to the famous list.
pub fn builtin_specs(extra_famous: &[String]) -> Vec<PatternSpec> {
    let k = KANJI_CLASS;
    let prefectures = PREFECTURES.join("|");

    let mut famous: Vec<&str> = FAMOUS_PLACES
        .iter()
        .copied()
        .chain(extra_famous.iter().map(String::as_str))
        .filter(|name| !name.is_empty())
        .collect();
    // Longest first so the alternation prefers 日本橋 over 日本.
    famous.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    famous.dedup();
    let famous = famous
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");

    let mut known: Vec<String> = KNOWN_COMPOUNDS
        .iter()
        .map(|(base, modifier)| format!("{base}{modifier}"))
        .collect();
    known.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    let known = known.join("|");

    vec![
        // Lexical
        PatternSpec::new(
            "complete-place",
            format!("(?:{prefectures})[{k}]{{2,8}}[市区町村]"),
            Category::CompletePlace,
            PatternGroup::Lexical,
        )
        .guarded(),
        PatternSpec::new(
            "prefecture",
            format!("(?:{prefectures})"),
            Category::Prefecture,
            PatternGroup::Lexical,
        )
        .guarded(),
        PatternSpec::new(
            "city",
            format!("[{k}]{{2,6}}[市区町村]"),
            Category::City,
            PatternGroup::Lexical,
        )
        .guarded()
        .screened(),
        PatternSpec::new(
            "county",
            format!("[{k}]{{2,4}}郡"),
            Category::County,
            PatternGroup::Lexical,
        )
        .guarded()
        .screened(),
        PatternSpec::new(
            "famous-place",
            famous,
            Category::FamousPlace,
            PatternGroup::Lexical,
        ),
        PatternSpec::new(
            "natural-place",
            format!("[{k}]{{1,4}}[川山湖海峠谷野原島岬浦崎]"),
            Category::NaturalPlace,
            PatternGroup::Lexical,
        )
        .guarded()
        .screened(),
        PatternSpec::new(
            "temple-shrine",
            format!("[{k}]{{2,6}}(?:寺|院|神社|宮)"),
            Category::TempleShrine,
            PatternGroup::Lexical,
        )
        .guarded()
        .screened(),
        // Compound
        PatternSpec::new(
            "station-front",
            format!("(?P<base>[{k}]{{2,}})(?P<modifier>駅前|駅後|駅周辺)"),
            Category::CompoundDirection,
            PatternGroup::Compound,
        )
        .screened(),
        PatternSpec::new(
            "direction",
            format!("(?P<base>[{k}]{{2,4}})(?P<modifier>[東西南北](?:口|側|部|地区))"),
            Category::CompoundDirection,
            PatternGroup::Compound,
        )
        .screened(),
        PatternSpec::new(
            "position",
            format!("(?P<base>[{k}]{{2,4}})(?P<modifier>[上下中](?:町|部)|[内外](?:地|側))"),
            Category::CompoundDirection,
            PatternGroup::Compound,
        )
        .screened(),
        PatternSpec::new(
            "facility-front",
            format!(
                "(?P<base>[{k}]{{2,}})(?P<modifier>市役所前|役場前|大学前|学校前|神社前|寺前|病院前|公園前)"
            ),
            Category::CompoundFacility,
            PatternGroup::Compound,
        )
        .screened(),
        PatternSpec::new(
            "terrain",
            format!("(?P<base>[{k}]{{2,4}})(?P<modifier>沿い|川岸|河畔|湖畔|山麓|山頂|山中|海岸|水辺)"),
            Category::CompoundTerrain,
            PatternGroup::Compound,
        )
        .screened(),
        PatternSpec::new(
            "known-compound",
            known,
            Category::FallbackCompound,
            PatternGroup::Compound,
        ),
    ]
}
