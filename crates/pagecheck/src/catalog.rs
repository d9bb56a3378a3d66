//! Acceptance suite for the books.toscrape.com demo catalog.
//!
//! Case names carry the user-story and acceptance-criterion tag they cover
//! (`US-002-AC01_…`). `NEG` cases are guard assertions: against the live site
//! they pass, against a broken page they fail.

use crate::assertion::{CountRule, Relation, TextPattern};
use crate::harness::{TestCase, TestSuite};
use crate::locator::Locator;
use crate::result::PagecheckResult;

/// Public demo catalog
pub const DEFAULT_BASE_URL: &str = "https://books.toscrape.com/";

/// Name of the suite built by [`catalog_suite`]
pub const SUITE_NAME: &str = "books-to-scrape";

const SIDEBAR: &str = ".side_categories";
const POD: &str = ".product_pod";
const NEXT: &str = "li.next a";
const BREADCRUMB: &str = ".breadcrumb";
const TABLE: &str = "table.table";
const THUMB: &str = "img.thumbnail";
const DETAIL_URL: &str = r"/catalogue/.*/index\.html";
const PAGE_2_URL: &str = r"page-2\.html";

/// Resolve `path` against `base`
fn at(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn first_pod() -> Locator {
    Locator::new(POD).first()
}

fn first_pod_link() -> Locator {
    Locator::new(".product_pod a").first()
}

/// Build the acceptance suite against `base_url`
///
/// # Errors
///
/// Returns error if a built-in pattern fails to compile
#[allow(clippy::too_many_lines)]
pub fn catalog_suite(base_url: &str) -> PagecheckResult<TestSuite> {
    let home = at(base_url, "");
    let open = |name: &str| TestCase::new(name).navigate(home.clone());
    let detail = |name: &str| open(name).click(first_pod_link());
    let re = TextPattern::regex;

    let mut suite = TestSuite::new(SUITE_NAME);
    let mut add = |case: TestCase| suite.add_case(case);

    // US-001 category browsing
    add(open("US-001-AC01_CategorySidebarVisible").expect_visible(SIDEBAR));
    add(open("US-001-AC02_CategoryShowsRelevantBooks")
        .click("text=Travel")
        .expect_text("h1", re("(?i)Travel")?));
    add(open("US-001-AC03_CategoryShowsCountPagination")
        .click("text=Travel")
        .expect_count(POD, CountRule::Exactly(11)));
    add(open("US-001-AC04_UrlStructureCategory")
        .click("text=Travel")
        .expect_url(re("/catalogue/category/books/travel")?));
    add(open("US-001-NEG01_CategoryNoBooks")
        .click("text=Poetry")
        .expect_text(".page-header h1", TextPattern::exact("Poetry"))
        .expect_count(POD, CountRule::AtMost(20)));
    add(open("US-001-NEG02_CategorySidebarBroken").expect_visible(SIDEBAR));

    // US-002 catalog grid
    add(open("US-002-AC01_MainCatalogGrid").expect_count(POD, CountRule::Exactly(20)));
    add(open("US-002-AC02_BookFieldDisplay")
        .expect_each_has(POD, "h3 a")
        .expect_each_has(POD, r#"div p[class="price_color"]"#)
        .expect_each_has(POD, r#"div p[class="instock availability"]"#));
    add(open("US-002-AC03_PaginationWorks")
        .click(NEXT)
        .expect_url(re(PAGE_2_URL)?));
    add(detail("US-002-AC04_ImageClickable").expect_url(re(DETAIL_URL)?));
    add(open("US-002-NEG01_BrokenPagination").expect_visible(NEXT));

    // US-003 detail page
    add(detail("US-003-AC01_DetailPageFields")
        .expect_visible(TABLE)
        .expect_visible(".instock")
        .expect_visible(".price_color")
        .expect_visible(".product_main"));
    add(detail("US-003-AC02_StockExactCount")
        .expect_text(".instock", TextPattern::contains("In stock")));
    add(detail("US-003-AC03_DescriptionExpandable").expect_visible("#product_description"));
    add(detail("US-003-AC04_HighQualityImage").expect_visible(".item.active img"));

    // US-004 site navigation
    add(open("US-004-AC01_SidebarAlwaysVisible")
        .expect_visible(SIDEBAR)
        .click(NEXT)
        .expect_visible(SIDEBAR));
    add(detail("US-004-AC02_BreadcrumbTrail").expect_visible(BREADCRUMB));
    add(open("US-004-AC03_LogoLinksHome")
        .click(r#"a:has-text("Books to Scrape")"#)
        .expect_url(TextPattern::exact(at(base_url, "index.html"))));
    add(open("US-004-AC04_NavigationStatePersists")
        .expect_visible(SIDEBAR)
        .click(first_pod_link())
        .expect_visible(BREADCRUMB));
    add(open("US-004-NEG01_BreadcrumbBroken").expect_visible(BREADCRUMB));

    // US-005 pagination
    add(open("US-005-AC01_PrevNextWorking")
        .expect_visible(NEXT)
        .click(NEXT)
        .expect_url(re(PAGE_2_URL)?));
    add(open("US-005-AC02_CurrentPageIndicated")
        .expect_text("li.current", TextPattern::contains("Page")));
    add(open("US-005-AC03_PageNavigationCategory")
        .click(r#"//a[contains(text(),"Travel")]"#)
        .expect_url(TextPattern::exact(at(
            base_url,
            "catalogue/category/books/travel_2/index.html",
        )))
        .expect_text(".page-header h1", TextPattern::exact("Travel")));
    add(open("US-005-AC04_DirectPageNumber").expect_visible("li.current"));

    // US-006 pricing and stock
    add(open("US-006-AC01_PriceFormatConsistent")
        .expect_each_text(".product_price .price_color", re(r"^£\d+\.\d{2}$")?));
    add(open("US-006-AC02_StockStatusClear").expect_each_has(POD, ".instock"));
    add(open("US-006-AC03_PriceMatchBetweenViews")
        .get_text(first_pod().locator(".price_color"), "list_price")
        .click(first_pod().locator("a").first())
        .get_text(".price_color", "detail_price")
        .expect_captured("list_price", Relation::Equals, "detail_price"));
    add(detail("US-006-AC04_TaxBreakdownDetail")
        .expect_text(TABLE, TextPattern::contains("Tax")));
    add(open("US-006-NEG01_PriceMissing").expect_each_has(POD, ".price_color"));

    // US-007 ratings
    add(open("US-007-AC01_StarRatingDisplays").expect_each_has(POD, ".star-rating"));
    add(open("US-007-AC02_StarRatingConsistent")
        .get_attribute(first_pod().locator(".star-rating"), "class", "list_rating")
        .click(first_pod().locator("a").first())
        .get_attribute(".star-rating", "class", "detail_rating")
        .expect_captured("list_rating", Relation::Equals, "detail_rating"));
    add(open("US-007-AC03_RatingDisplayLevel").expect_each_has(POD, ".star-rating"));
    add(open("US-007-AC04_RatingHelpsComparison")
        .expect_any_attribute(".product_pod .star-rating", "class", re(r"\bOne\b")?)
        .expect_any_attribute(".product_pod .star-rating", "class", re(r"\bFive\b")?));
    add(open("US-007-NEG01_BrokenStars").expect_each_has(POD, ".star-rating"));

    // US-008 images
    add(open("US-008-AC01_BookImageLoads").expect_each_visible(THUMB));
    add(open("US-008-AC02_ImagesClickable")
        .click(Locator::new(THUMB).first())
        .expect_url(re(DETAIL_URL)?));
    add(open("US-008-AC03_AltTextAccessibility").expect_each_attribute(THUMB, "alt", re(".+")?));
    add(open("US-008-AC04_ImageAspectRatio").expect_each_has(".image_container", THUMB));
    add(open("US-008-NEG01_BrokenImages").expect_each_attribute(THUMB, "src", re(".+")?));

    // US-009 product data
    add(detail("US-009-AC01_TableHasAllData")
        .expect_text(TABLE, TextPattern::contains("UPC"))
        .expect_text(TABLE, TextPattern::contains("Tax")));
    add(open("US-009-AC02_DataAccurateBetweenPages")
        .get_attribute(first_pod().locator("h3 a"), "title", "list_title")
        .click(first_pod().locator("a").first())
        .get_text(".product_main h1", "detail_title")
        .expect_captured("list_title", Relation::Contains, "detail_title"));
    add(detail("US-009-AC03_ReviewCountVisible")
        .expect_text(TABLE, TextPattern::contains("Number of reviews")));
    add(detail("US-009-AC04_CategoryIsClear").expect_visible(BREADCRUMB));

    Ok(suite)
}
