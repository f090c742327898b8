//! End-to-end engine scenarios exercising the full stack: synthetic seed
//! documents, fan-out, filtering, metadata-driven ordering, streams, caching,
//! and nested execution.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_engine::{
    Engine, EngineConfig, ExecutionContext, Fingerprint, FnModule, Module, Pipeline,
};
use strata_meta::MetadataValue;

fn entry(key: &str, value: impl Into<MetadataValue>) -> (String, MetadataValue) {
    (key.to_string(), value.into())
}

/// Fan out: ignores its input and emits `count` documents with content
/// `"item-<n>"` and metadata `n`.
fn generator(count: i64) -> Arc<dyn Module> {
    Arc::new(FnModule::new(
        "generator",
        Arc::new(move |_inputs, ctx: ExecutionContext| {
            Box::pin(async move {
                (1..=count)
                    .map(|n| {
                        ctx.new_document(
                            None,
                            Some(format!("item-{n}").into()),
                            vec![entry("n", n)],
                        )
                    })
                    .collect()
            })
        }),
    ))
}

/// Keeps documents with `n > min`, doubles their content, and sorts the
/// output by `n`.
fn filter_and_double(min: i64) -> Arc<dyn Module> {
    Arc::new(FnModule::new(
        "filter_and_double",
        Arc::new(move |inputs, _ctx| {
            Box::pin(async move {
                let mut kept = Vec::new();
                for doc in inputs {
                    let n = doc.metadata().get_as("n", 0i64)?;
                    if n > min {
                        let text = doc.content().await?;
                        kept.push((
                            n,
                            doc.clone_with_content(
                                None,
                                format!("{text}{text}"),
                                [entry("doubled", n * 2)],
                            ),
                        ));
                    }
                }
                kept.sort_by_key(|(n, _)| *n);
                Ok(kept.into_iter().map(|(_, doc)| doc).collect())
            })
        }),
    ))
}

#[tokio::test]
async fn test_generate_filter_transform() {
    let mut engine = Engine::new(EngineConfig::default());
    engine
        .add_pipeline(
            Pipeline::new("content")
                .with_module(generator(3))
                .with_module(filter_and_double(1)),
        )
        .unwrap();

    let summary = engine.execute().await.unwrap();
    assert_eq!(summary.pipelines.len(), 1);
    assert_eq!(summary.pipelines[0].documents, 2);

    let docs = engine.documents().from_pipeline("content");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].content().await.unwrap(), "item-2item-2");
    assert_eq!(docs[1].content().await.unwrap(), "item-3item-3");
    assert_eq!(docs[0].metadata().get_as("n", 0i64).unwrap(), 2);
    assert_eq!(docs[1].metadata().get_as("n", 0i64).unwrap(), 3);
    assert_eq!(docs[0].metadata().get_as("doubled", 0i64).unwrap(), 4);
    assert_eq!(docs[1].metadata().get_as("doubled", 0i64).unwrap(), 6);
}

#[tokio::test]
async fn test_stream_documents_flow_through_a_pipeline() {
    // A module producing binary payloads and one consuming them via
    // exclusive checkout.
    let produce = Arc::new(FnModule::new(
        "produce",
        Arc::new(|_inputs, ctx: ExecutionContext| {
            Box::pin(async move {
                let bytes: Vec<u8> = b"\x00\x01binary".to_vec();
                let content = strata_doc::Content::stream(Box::new(Cursor::new(bytes)));
                Ok(vec![ctx.new_document(None, Some(content), vec![])?])
            })
        }),
    ));
    let measure = Arc::new(FnModule::new(
        "measure",
        Arc::new(|inputs: Vec<strata_doc::Document>, _ctx| {
            Box::pin(async move {
                let mut out = Vec::new();
                for doc in inputs {
                    let len = {
                        let mut checkout = doc.checkout_stream().await?;
                        let mut buf = Vec::new();
                        std::io::Read::read_to_end(&mut checkout, &mut buf)
                            .map_err(strata_doc::DocumentError::from)?;
                        buf.len() as i64
                    };
                    out.push(doc.clone_with_metadata([entry("bytes", len)]));
                }
                Ok(out)
            })
        }),
    ));

    let mut engine = Engine::new(EngineConfig::default());
    engine
        .add_pipeline(
            Pipeline::new("assets")
                .with_module(produce)
                .with_module(measure),
        )
        .unwrap();
    engine.execute().await.unwrap();

    let docs = engine.documents().from_pipeline("assets");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].metadata().get_as("bytes", 0i64).unwrap(), 8);
}

#[tokio::test]
async fn test_nested_execution_inside_a_pipeline() {
    // An aggregator that runs a sub-pipeline per group and merges results.
    let group_and_render = Arc::new(FnModule::new(
        "group_and_render",
        Arc::new(|inputs: Vec<strata_doc::Document>, ctx: ExecutionContext| {
            Box::pin(async move {
                let render = Arc::new(FnModule::new(
                    "render",
                    Arc::new(|docs: Vec<strata_doc::Document>, _| {
                        Box::pin(async move {
                            let mut out = Vec::new();
                            for doc in docs {
                                let text = doc.content().await?;
                                out.push(doc.clone_with_content(None, format!("<p>{text}</p>"), []));
                            }
                            Ok(out)
                        })
                    }),
                )) as Arc<dyn Module>;

                let mut merged = Vec::new();
                for doc in inputs {
                    let rendered = ctx
                        .execute_nested(std::slice::from_ref(&render), Some(vec![doc]), vec![])
                        .await?;
                    merged.extend(rendered);
                }
                Ok(merged)
            })
        }),
    ));

    let mut engine = Engine::new(EngineConfig::default());
    engine
        .add_pipeline(
            Pipeline::new("pages")
                .with_module(generator(2))
                .with_module(group_and_render),
        )
        .unwrap();
    engine.execute().await.unwrap();

    let docs = engine.documents().from_pipeline("pages");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].content().await.unwrap(), "<p>item-1</p>");
    assert_eq!(docs[1].content().await.unwrap(), "<p>item-2</p>");
}

#[tokio::test]
async fn test_cache_survives_within_a_pass_across_pipelines() {
    // Two pipelines sharing one expensive computation through the cache.
    let computes = Arc::new(AtomicUsize::new(0));

    fn expensive(computes: Arc<AtomicUsize>) -> Arc<dyn Module> {
        Arc::new(FnModule::new(
            "expensive",
            Arc::new(move |_inputs, ctx: ExecutionContext| {
                let computes = computes.clone();
                Box::pin(async move {
                    let fp = Fingerprint::builder("expensive").update("shared-input").finish();
                    ctx.cache()
                        .get_or_compute(fp, || async {
                            computes.fetch_add(1, Ordering::SeqCst);
                            Ok(vec![ctx.new_document(None, Some("result".into()), vec![])?])
                        })
                        .await
                })
            }),
        ))
    }

    let mut engine = Engine::new(EngineConfig::default());
    engine
        .add_pipeline(Pipeline::new("first").with_module(expensive(computes.clone())))
        .unwrap();
    engine
        .add_pipeline(Pipeline::new("second").with_module(expensive(computes.clone())))
        .unwrap();

    engine.execute().await.unwrap();
    assert_eq!(computes.load(Ordering::SeqCst), 1);
    // Both pipelines produced the shared result.
    assert_eq!(engine.documents().from_pipeline("first").len(), 1);
    assert_eq!(engine.documents().from_pipeline("second").len(), 1);
}

#[tokio::test]
async fn test_no_cache_mode_still_runs_everything() {
    let computes = Arc::new(AtomicUsize::new(0));
    let module_computes = computes.clone();
    let module = Arc::new(FnModule::new(
        "m",
        Arc::new(move |_inputs, ctx: ExecutionContext| {
            let computes = module_computes.clone();
            Box::pin(async move {
                let fp = Fingerprint::from_key("m");
                ctx.cache()
                    .get_or_compute(fp, || async {
                        computes.fetch_add(1, Ordering::SeqCst);
                        Ok(vec![ctx.new_document(None, Some("v".into()), vec![])?])
                    })
                    .await
            })
        }),
    ));

    let mut engine = Engine::new(EngineConfig {
        no_cache: true,
        ..EngineConfig::default()
    });
    engine
        .add_pipeline(Pipeline::new("a").with_module(module.clone()))
        .unwrap();
    engine
        .add_pipeline(Pipeline::new("b").with_module(module))
        .unwrap();
    engine.execute().await.unwrap();
    // Same fingerprint, but nothing was stored.
    assert_eq!(computes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_lazy_settings_resolve_inside_modules() {
    // A lazy engine setting that derives from another setting on first read.
    let probe = Arc::new(FnModule::new(
        "probe",
        Arc::new(|inputs: Vec<strata_doc::Document>, _ctx| {
            Box::pin(async move {
                let feed = inputs[0]
                    .metadata()
                    .get_as("feed_url", String::new())?;
                assert_eq!(feed, "https://example.org/feed.xml");
                Ok(inputs)
            })
        }),
    ));

    let config = EngineConfig::default()
        .with_initial("base_url", "https://example.org")
        .with_initial(
            "feed_url",
            MetadataValue::lazy(strata_meta::CachePolicy::CachedOnce, |_key, meta| {
                let base: String = meta.require("base_url")?;
                Ok(format!("{base}/feed.xml").into())
            }),
        );

    let mut engine = Engine::new(config);
    engine
        .add_pipeline(Pipeline::new("p").with_module(probe))
        .unwrap();
    engine.execute().await.unwrap();
}
