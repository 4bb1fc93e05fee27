use futures_util::StreamExt;
use h1pool::{ConnectionPool, Limits, PoolConfig, Request};
use std::sync::Arc;

/// Fetch every url given as argument, twice, sharing one pool.
///
/// ```bash
/// RUST_LOG=h1pool=trace cargo run -p example -- http://example.com/ http://httpbin.org/get
/// ```
#[tokio::main]
async fn main() -> Result<(), h1pool::Error> {
    env_logger::init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    let config = PoolConfig::default().with_limits(Limits {
        max_connections: 4,
        ..Limits::default()
    });
    let pool = Arc::new(ConnectionPool::new(config)?);

    let mut tasks = Vec::new();
    for url in urls.iter().chain(urls.iter()) {
        let pool = pool.clone();
        let url = url.clone();
        tasks.push(tokio::spawn(async move { fetch(&pool, &url).await }));
    }

    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => eprintln!("error: {err}"),
            Err(err) => eprintln!("task failed: {err}"),
        }
    }

    println!("{:?}", pool.stats());
    pool.close();
    Ok(())
}

async fn fetch(pool: &ConnectionPool, url: &str) -> Result<(), h1pool::Error> {
    let request = Request::get(url)?
        .with_header("User-Agent", "h1pool-example")
        .with_stream(true);
    let mut response = pool.request(request).await?;

    println!("< {} {} {}", url, response.version(), response.status());
    for (name, value) in response.headers() {
        println!(
            "< {}: {}",
            String::from_utf8_lossy(name),
            String::from_utf8_lossy(value)
        );
    }

    let mut body = response.stream()?;
    let mut len = 0;
    while let Some(chunk) = body.next().await {
        len += chunk?.len();
    }
    println!("< {url} {len} bytes");

    Ok(())
}
